//! Build orchestration.
//!
//! Flow: index → validate (preconditions, unique outputs) → copy assets →
//! strategy → persist
//!
//! A run ends in exactly one of three ways: `Build completed` followed by one
//! stored [`BuildRecord`], a single `Build failed: ..` error line, or a single
//! `Build cancelled` warning. Only the first persists anything.

use crate::config::{BuildConfig, SiteConfig};
use crate::disk::Disk;
use crate::error::BuildError;
use crate::index::SourceIndexer;
use crate::layout::Layouts;
use crate::logger::BuildLogger;
use crate::markdown::MarkdownProcessor;
use crate::output::OutputWriter;
use crate::store::{BuildRecord, BuildStore};
use crate::strategy::{self, BuildContext};
use pagewright_types::{BuildId, BuildLogLine, BuildPhase, BuildResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;

/// Cooperative cancellation flag, checked between files and phases
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Terminal state of one run
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub result: BuildResult,
    pub logs: Vec<BuildLogLine>,
    /// Set only when the build completed and its record was stored
    pub build_id: Option<BuildId>,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        self.result.success
    }
}

pub struct BuildPipeline {
    source: Arc<dyn Disk>,
    destination: Arc<dyn Disk>,
    store: Arc<dyn BuildStore>,
    indexers: Mutex<HashMap<PathBuf, Weak<SourceIndexer>>>,
    phase: watch::Sender<BuildPhase>,
}

impl BuildPipeline {
    pub fn new(
        source: Arc<dyn Disk>,
        destination: Arc<dyn Disk>,
        store: Arc<dyn BuildStore>,
    ) -> Self {
        let (phase, _) = watch::channel(BuildPhase::Idle);
        Self {
            source,
            destination,
            store,
            indexers: Mutex::new(HashMap::new()),
            phase,
        }
    }

    /// Watch phase transitions of subsequent runs
    pub fn subscribe(&self) -> watch::Receiver<BuildPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> BuildPhase {
        *self.phase.borrow()
    }

    pub async fn run(&self, config: &BuildConfig, cancel: &CancelSignal) -> BuildOutcome {
        self.run_with_logger(config, cancel, BuildLogger::new()).await
    }

    /// Run with a caller-supplied logger, e.g. one with sinks attached
    pub async fn run_with_logger(
        &self,
        config: &BuildConfig,
        cancel: &CancelSignal,
        mut logger: BuildLogger,
    ) -> BuildOutcome {
        self.phase.send_replace(BuildPhase::Idle);
        logger.info(format!(
            "Starting {} build: {} -> {}",
            config.strategy,
            config.source_root.display(),
            config.output_root.display()
        ));

        match self.execute(config, cancel, &mut logger).await {
            Ok(()) => self.complete(config, logger).await,
            Err(err) => self.abort(err, logger),
        }
    }

    /// Resolve a site configuration, failing the run if it is invalid
    pub async fn run_site_config(&self, site: &SiteConfig, cancel: &CancelSignal) -> BuildOutcome {
        self.run_site_config_with_logger(site, cancel, BuildLogger::new())
            .await
    }

    pub async fn run_site_config_with_logger(
        &self,
        site: &SiteConfig,
        cancel: &CancelSignal,
        logger: BuildLogger,
    ) -> BuildOutcome {
        match site.to_build_config() {
            Ok(config) => self.run_with_logger(&config, cancel, logger).await,
            Err(err) => self.abort(err.into(), logger),
        }
    }

    async fn execute(
        &self,
        config: &BuildConfig,
        cancel: &CancelSignal,
        logger: &mut BuildLogger,
    ) -> Result<(), BuildError> {
        checkpoint(cancel)?;
        self.enter(BuildPhase::Indexing, logger);
        let indexer = self.indexer_for(&config.source_root);
        let count = indexer.index().await?;
        logger.info(format!("Indexed {} entries", count));

        let layouts = Layouts::load(self.source.clone(), &config.source_root, logger).await?;
        let writer = OutputWriter::new(self.destination.clone(), &config.output_root);
        let markdown = MarkdownProcessor::new();
        let runner = strategy::runner(config.strategy);

        let mut cx = BuildContext {
            config,
            indexer: &indexer,
            source: self.source.as_ref(),
            writer: &writer,
            layouts: &layouts,
            markdown: &markdown,
            logger,
            cancel,
        };
        runner.validate(&mut cx).await?;
        cx.check_outputs(runner.planned_outputs(&cx))?;

        cx.checkpoint()?;
        self.enter(BuildPhase::CopyingAssets, cx.logger);
        let copied = cx.copy_assets().await?;
        cx.logger.info(format!("Copied {} assets", copied));

        cx.checkpoint()?;
        self.enter(BuildPhase::StrategyProcessing, cx.logger);
        runner.run(&mut cx).await
    }

    async fn complete(&self, config: &BuildConfig, mut logger: BuildLogger) -> BuildOutcome {
        logger.info("Build completed");

        let record = BuildRecord {
            label: config.label(),
            source_disk_id: self.source.id().to_string(),
            logs: logger.lines().to_vec(),
        };
        let id = match self.store.create(record).await {
            Ok(id) => id,
            Err(err) => return self.abort(err.into(), logger),
        };
        logger.info(format!("Saved build {}", id));

        self.phase.send_replace(BuildPhase::Completed);
        BuildOutcome {
            result: BuildResult::completed(),
            logs: logger.into_lines(),
            build_id: Some(id),
        }
    }

    fn abort(&self, err: BuildError, mut logger: BuildLogger) -> BuildOutcome {
        let result = if err.is_cancelled() {
            logger.warning("Build cancelled");
            self.phase.send_replace(BuildPhase::Cancelled);
            BuildResult::cancelled()
        } else {
            logger.error(format!("Build failed: {}", err));
            self.phase.send_replace(BuildPhase::Failed);
            BuildResult::failed(err.to_string())
        };

        BuildOutcome {
            result,
            logs: logger.into_lines(),
            build_id: None,
        }
    }

    fn enter(&self, phase: BuildPhase, logger: &mut BuildLogger) {
        logger.info(format!("Phase: {}", phase));
        self.phase.send_replace(phase);
    }

    /// One indexer per source root, shared by the runs currently using it
    ///
    /// Entries are dropped once no run holds the indexer.
    fn indexer_for(&self, root: &Path) -> Arc<SourceIndexer> {
        let mut indexers = self.indexers.lock();
        indexers.retain(|_, indexer| indexer.strong_count() > 0);

        if let Some(indexer) = indexers.get(root).and_then(Weak::upgrade) {
            return indexer;
        }
        let indexer = Arc::new(SourceIndexer::new(self.source.clone(), root));
        indexers.insert(root.to_path_buf(), Arc::downgrade(&indexer));
        indexer
    }
}

fn checkpoint(cancel: &CancelSignal) -> Result<(), BuildError> {
    if cancel.is_cancelled() {
        Err(BuildError::Cancelled)
    } else {
        Ok(())
    }
}
