//! Build error taxonomy.

use crate::config::ConfigError;
use crate::frontmatter::FrontmatterError;
use crate::index::IndexError;
use crate::output::OutputError;
use crate::store::StoreError;
use crate::template::TemplateError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{} declares no layout in its front matter", .path.display())]
    MissingLayout { path: PathBuf },

    #[error("Template '{name}' not found (looked for {})", display_paths(.searched))]
    TemplateNotFound { name: String, searched: Vec<PathBuf> },

    #[error("No pages found in {}", .dir.display())]
    EmptyPageSet { dir: PathBuf },

    #[error(
        "{} and {} both write {}",
        .first.display(),
        .second.display(),
        .output.display()
    )]
    OutputCollision {
        output: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Build cancelled")]
    Cancelled,

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid front matter in {}: {source}", .path.display())]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },

    #[error("Failed to render {}: {source}", .path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("Failed to persist build record: {0}")]
    Store(#[from] StoreError),
}

/// Coarse category of a [`BuildError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    MissingLayout,
    TemplateNotFound,
    EmptyPageSet,
    OutputCollision,
    Cancelled,
    Unclassified,
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Config(_) => ErrorKind::Config,
            BuildError::MissingLayout { .. } => ErrorKind::MissingLayout,
            BuildError::TemplateNotFound { .. } => ErrorKind::TemplateNotFound,
            BuildError::EmptyPageSet { .. } => ErrorKind::EmptyPageSet,
            BuildError::OutputCollision { .. } => ErrorKind::OutputCollision,
            BuildError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Unclassified,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled)
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
