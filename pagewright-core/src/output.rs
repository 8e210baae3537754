//! Output path mapping and writing.

use crate::classify::{is_markdown, is_template};
use crate::disk::Disk;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Path {} escapes the output root", .0.display())]
    Escapes(PathBuf),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Map a source-relative path to its output-relative path
///
/// `.mustache`, `.ejs` and `.md` become `.html`; everything else is unchanged.
pub fn output_path(source: &Path) -> PathBuf {
    if is_template(source) || is_markdown(source) {
        source.with_extension("html")
    } else {
        source.to_path_buf()
    }
}

/// Lexically normalise a relative path, refusing anything that could leave its root
pub fn normalize_relative(path: &Path) -> Result<PathBuf, OutputError> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => normalized.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(OutputError::Escapes(path.to_path_buf()));
            }
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(OutputError::Escapes(path.to_path_buf()));
    }
    Ok(normalized)
}

/// Persists build output under a fixed root on a destination disk
#[derive(Clone)]
pub struct OutputWriter {
    disk: Arc<dyn Disk>,
    root: PathBuf,
}

impl OutputWriter {
    pub fn new(disk: Arc<dyn Disk>, root: impl Into<PathBuf>) -> Self {
        Self {
            disk,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute destination for an output-relative path
    pub fn resolve(&self, relative: &Path) -> Result<PathBuf, OutputError> {
        Ok(self.root.join(normalize_relative(relative)?))
    }

    /// Write bytes at `relative`, creating parent directories first
    pub async fn write(&self, relative: &Path, contents: &[u8]) -> Result<PathBuf, OutputError> {
        let target = self.resolve(relative)?;
        let wrap = |source| OutputError::Write {
            path: target.clone(),
            source,
        };

        if let Some(parent) = target.parent() {
            self.disk.create_dir_all(parent).await.map_err(wrap)?;
        }
        self.disk.write(&target, contents).await.map_err(wrap)?;

        tracing::debug!(path = %target.display(), bytes = contents.len(), "wrote output");
        Ok(target)
    }

    pub async fn write_str(&self, relative: &Path, contents: &str) -> Result<PathBuf, OutputError> {
        self.write(relative, contents.as_bytes()).await
    }
}
