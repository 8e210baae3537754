//! Shared types for pagewright
//!
//! This crate provides the plain data exchanged between the build pipeline,
//! its collaborators and the command line: strategies, file nodes, log lines
//! and build results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Whole-build processing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Every file is copied or rendered 1:1
    Freeform,
    /// `_pages/` is concatenated into a single `index.html`
    Book,
    /// `posts/` becomes an index page plus one page per post
    Blog,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Freeform, Strategy::Book, Strategy::Blog];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Freeform => "freeform",
            Strategy::Book => "book",
            Strategy::Blog => "blog",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown strategy '{0}' (expected one of: freeform, book, blog)")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "freeform" => Ok(Strategy::Freeform),
            "book" => Ok(Strategy::Book),
            "blog" => Ok(Strategy::Blog),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// Kind of an indexed node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Dir,
}

/// A file or directory discovered by the source indexer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileNode {
    /// Full path on the source disk
    pub path: PathBuf,
    pub kind: NodeKind,
}

impl FileNode {
    pub fn new(path: impl Into<PathBuf>, kind: NodeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Dir
    }

    /// Path relative to `root`, if the node lives under it
    pub fn relative_to(&self, root: &Path) -> Option<&Path> {
        self.path.strip_prefix(root).ok()
    }
}

/// Severity of a build log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a build transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildLogLine {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub level: LogLevel,
}

impl BuildLogLine {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            level,
        }
    }
}

impl fmt::Display for BuildLogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.level.as_str().to_uppercase(),
            self.message
        )
    }
}

/// Pipeline state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildPhase {
    Idle,
    Indexing,
    CopyingAssets,
    StrategyProcessing,
    Completed,
    Failed,
    Cancelled,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhase::Idle => "idle",
            BuildPhase::Indexing => "indexing",
            BuildPhase::CopyingAssets => "copying-assets",
            BuildPhase::StrategyProcessing => "strategy-processing",
            BuildPhase::Completed => "completed",
            BuildPhase::Failed => "failed",
            BuildPhase::Cancelled => "cancelled",
        }
    }

    /// Terminal phases perform no further writes
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BuildPhase::Completed | BuildPhase::Failed | BuildPhase::Cancelled
        )
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a build run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Terminal value of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: BuildStatus,
}

impl BuildResult {
    pub fn completed() -> Self {
        Self {
            success: true,
            error: None,
            status: BuildStatus::Completed,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            status: BuildStatus::Failed,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            success: false,
            error: Some("Build cancelled".to_string()),
            status: BuildStatus::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BuildStatus::Cancelled
    }
}

/// Identifier returned by build record persistence
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildId(pub String);

impl BuildId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
