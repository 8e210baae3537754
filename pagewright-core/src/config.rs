//! Configuration parsing and management.

use pagewright_types::{Strategy, UnknownStrategy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error(transparent)]
    UnknownStrategy(#[from] UnknownStrategy),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Settings for one build invocation; immutable for the duration of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub strategy: Strategy,
    pub source_root: PathBuf,
    pub output_root: PathBuf,

    /// Label stored with the build record
    #[serde(default)]
    pub label: Option<String>,
}

impl BuildConfig {
    pub fn new(
        strategy: Strategy,
        source_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            strategy,
            source_root: source_root.into(),
            output_root: output_root.into(),
            label: None,
        }
    }

    /// Build a config from an unchecked strategy name
    pub fn parse(
        strategy: &str,
        source_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(strategy.parse()?, source_root, output_root))
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{} build", self.strategy))
    }

    /// Output root relative to the source root, when the output lives inside the source
    pub fn output_within_source(&self) -> Option<&Path> {
        self.output_root
            .strip_prefix(&self.source_root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
    }
}

/// Contents of a `pagewright.yml` file
///
/// Every field is optional so that command line flags can fill the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builds_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

impl SiteConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: SiteConfig = serde_yaml::from_str(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Source directory, resolved relative to the config file (defaults to its directory)
    pub fn source_dir(&self) -> PathBuf {
        self.resolve_path(self.source.as_deref().unwrap_or(Path::new(".")))
    }

    /// Output directory, resolved relative to the config file (defaults to `dist`)
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(self.output.as_deref().unwrap_or(Path::new("dist")))
    }

    /// Build record directory (defaults to `.pagewright/builds`)
    pub fn builds_dir(&self) -> PathBuf {
        self.resolve_path(
            self.builds_dir
                .as_deref()
                .unwrap_or(Path::new(".pagewright/builds")),
        )
    }

    /// Validate and freeze into a [`BuildConfig`]
    pub fn to_build_config(&self) -> Result<BuildConfig, ConfigError> {
        let strategy = self
            .strategy
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField("strategy".to_string()))?;
        let mut config = BuildConfig::parse(strategy, self.source_dir(), self.output_dir())?;
        config.label = self.label.clone();
        Ok(config)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            match config_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.join(path),
                _ => path.to_path_buf(),
            }
        } else {
            path.to_path_buf()
        }
    }
}
