//! Build command implementation.

use anyhow::{Context, Result};
use pagewright_core::{
    BuildPipeline, BuildStatus, CancelSignal, Disk, JsonBuildStore, LocalDisk, SiteConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command line overrides for `pagewright build`
#[derive(Debug, Default)]
pub struct BuildOptions {
    pub config: PathBuf,
    pub strategy: Option<String>,
    pub source: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub builds_dir: Option<PathBuf>,
    pub label: Option<String>,
}

/// Build the site described by the config file and flags
pub async fn build_site(opts: BuildOptions) -> Result<()> {
    let site = load_site_config(&opts)?;
    let output_dir = site.output_dir();

    let disk: Arc<dyn Disk> = Arc::new(LocalDisk::default());
    let store = Arc::new(JsonBuildStore::new(site.builds_dir()));
    let pipeline = BuildPipeline::new(disk.clone(), disk, store);

    // Ctrl-C only raises the flag; the pipeline stops at its next checkpoint
    let cancel = CancelSignal::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling build");
                cancel.cancel();
            }
        }
    });

    let outcome = pipeline.run_site_config(&site, &cancel).await;
    interrupt.abort();

    match outcome.result.status {
        BuildStatus::Completed => {
            if let Some(id) = &outcome.build_id {
                println!("✓ Build {} written to {:?}", id, output_dir);
            }
            Ok(())
        }
        BuildStatus::Cancelled => anyhow::bail!("Build cancelled"),
        BuildStatus::Failed => anyhow::bail!(
            "Build failed: {}",
            outcome.result.error.unwrap_or_default()
        ),
    }
}

fn load_site_config(opts: &BuildOptions) -> Result<SiteConfig> {
    let mut site = if opts.config.exists() {
        tracing::info!("Loading config from {:?}", opts.config);
        SiteConfig::from_file(&opts.config).context("Failed to load configuration")?
    } else {
        tracing::debug!("No config at {:?}, using flags only", opts.config);
        SiteConfig::default()
    };

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let from_cwd = |path: &Path| cwd.join(path);

    if let Some(strategy) = &opts.strategy {
        site.strategy = Some(strategy.clone());
    }
    if let Some(source) = &opts.source {
        site.source = Some(from_cwd(source));
    }
    if let Some(output) = &opts.output {
        site.output = Some(from_cwd(output));
    }
    if let Some(builds_dir) = &opts.builds_dir {
        site.builds_dir = Some(from_cwd(builds_dir));
    }
    if let Some(label) = &opts.label {
        site.label = Some(label.clone());
    }

    // Absolute roots keep the output-inside-source check purely lexical
    site.source = Some(from_cwd(&site.source_dir()));
    site.output = Some(from_cwd(&site.output_dir()));
    site.builds_dir = Some(from_cwd(&site.builds_dir()));

    Ok(site)
}
