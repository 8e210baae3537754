//! # pagewright CLI
//!
//! Command-line interface for the pagewright static site builder.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagewright")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new site
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,

        /// Publishing strategy: freeform, book or blog
        #[arg(long, default_value = "freeform")]
        strategy: String,
    },

    /// Build the site
    Build {
        /// Path to configuration file
        #[arg(long, default_value = "pagewright.yml")]
        config: PathBuf,

        /// Publishing strategy: freeform, book or blog
        #[arg(long)]
        strategy: Option<String>,

        /// Source directory
        #[arg(long)]
        source: Option<PathBuf>,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Where build records are stored
        #[arg(long)]
        builds_dir: Option<PathBuf>,

        /// Label stored with the build record
        #[arg(long)]
        label: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path, strategy } => commands::init_project(path.as_deref(), &strategy),
        Commands::Build {
            config,
            strategy,
            source,
            output,
            builds_dir,
            label,
        } => {
            let opts = commands::BuildOptions {
                config,
                strategy,
                source,
                output,
                builds_dir,
                label,
            };
            commands::build_site(opts).await
        }
    }
}
