//! Publishing strategies.
//!
//! Each [`Strategy`] has one [`StrategyRunner`]. The pipeline validates the
//! runner's preconditions before anything is written, copies assets, then
//! hands over to [`StrategyRunner::run`].

mod blog;
mod book;
mod freeform;

pub use blog::{BlogStrategy, BLOG_INDEX_LAYOUT, POSTS_DIR};
pub use book::{BookStrategy, BOOK_LAYOUT, PAGES_DIR, PAGE_BREAK};
pub use freeform::FreeformStrategy;

use crate::classify::{classify, FileClass};
use crate::config::BuildConfig;
use crate::disk::Disk;
use crate::error::BuildError;
use crate::index::SourceIndexer;
use crate::layout::Layouts;
use crate::logger::BuildLogger;
use crate::markdown::MarkdownProcessor;
use crate::output::{output_path, OutputWriter};
use crate::pipeline::CancelSignal;
use async_trait::async_trait;
use pagewright_types::{FileNode, Strategy};
use std::collections::HashMap;
use std::path::PathBuf;

/// Everything a strategy needs for one run
pub struct BuildContext<'a> {
    pub config: &'a BuildConfig,
    pub indexer: &'a SourceIndexer,
    pub source: &'a dyn Disk,
    pub writer: &'a OutputWriter,
    pub layouts: &'a Layouts,
    pub markdown: &'a MarkdownProcessor,
    pub logger: &'a mut BuildLogger,
    pub cancel: &'a CancelSignal,
}

impl BuildContext<'_> {
    /// Stop here if cancellation was requested
    pub fn checkpoint(&self) -> Result<(), BuildError> {
        if self.cancel.is_cancelled() {
            Err(BuildError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Indexed files that take part in the build, with their source-relative paths
    ///
    /// Ignored paths and anything under the output root are left out.
    pub fn source_files(&self) -> Vec<(FileNode, PathBuf)> {
        let output = self.config.output_within_source();
        self.indexer
            .files()
            .filter(|(_, rel)| match output {
                Some(output) => !rel.starts_with(output),
                None => true,
            })
            .filter(|(_, rel)| classify(rel) != FileClass::Ignored)
            .collect()
    }

    /// `(output, source)` for every asset the copy phase will write
    pub fn asset_outputs(&self) -> Vec<(PathBuf, PathBuf)> {
        self.source_files()
            .into_iter()
            .filter(|(_, rel)| classify(rel) == FileClass::Asset)
            .map(|(_, rel)| (output_path(&rel), rel))
            .collect()
    }

    /// Fail if any two sources, assets included, would write the same output file
    pub fn check_outputs(&self, rendered: Vec<(PathBuf, PathBuf)>) -> Result<(), BuildError> {
        let mut claims = OutputClaims::default();
        for (output, source) in self.asset_outputs().into_iter().chain(rendered) {
            claims.claim(output, source)?;
        }
        tracing::debug!(outputs = claims.len(), "output paths are unique");
        Ok(())
    }

    /// Copy every asset byte-for-byte, returning how many were written
    pub async fn copy_assets(&mut self) -> Result<usize, BuildError> {
        let mut copied = 0;
        for (node, rel) in self.source_files() {
            if classify(&rel) != FileClass::Asset {
                continue;
            }
            self.checkpoint()?;

            let bytes = self
                .source
                .read(&node.path)
                .await
                .map_err(|source| BuildError::Read {
                    path: rel.clone(),
                    source,
                })?;
            self.writer.write(&output_path(&rel), &bytes).await?;
            tracing::debug!(path = %rel.display(), "copied asset");
            copied += 1;
        }
        Ok(copied)
    }
}

/// Output path to the source that writes it
#[derive(Debug, Default)]
pub struct OutputClaims {
    claims: HashMap<PathBuf, PathBuf>,
}

impl OutputClaims {
    pub fn claim(&mut self, output: PathBuf, source: PathBuf) -> Result<(), BuildError> {
        if let Some(first) = self.claims.get(&output) {
            return Err(BuildError::OutputCollision {
                first: first.clone(),
                second: source,
                output,
            });
        }
        self.claims.insert(output, source);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

#[async_trait]
pub trait StrategyRunner: Send + Sync {
    fn strategy(&self) -> Strategy;

    /// `(output, source)` for every file `run` will write, assets excluded
    fn planned_outputs(&self, cx: &BuildContext<'_>) -> Vec<(PathBuf, PathBuf)>;

    /// Checks that must pass before any output is written
    async fn validate(&self, _cx: &mut BuildContext<'_>) -> Result<(), BuildError> {
        Ok(())
    }

    async fn run(&self, cx: &mut BuildContext<'_>) -> Result<(), BuildError>;
}

pub fn runner(strategy: Strategy) -> &'static dyn StrategyRunner {
    match strategy {
        Strategy::Freeform => &FreeformStrategy,
        Strategy::Book => &BookStrategy,
        Strategy::Blog => &BlogStrategy,
    }
}
