//! Persistence of completed builds.

use async_trait::async_trait;
use pagewright_types::{BuildId, BuildLogLine};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to encode build record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Metadata kept for a successful build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub label: String,
    pub source_disk_id: String,
    pub logs: Vec<BuildLogLine>,
}

#[async_trait]
pub trait BuildStore: Send + Sync {
    /// Persist a completed build and return its identifier
    async fn create(&self, record: BuildRecord) -> Result<BuildId, StoreError>;
}

/// Writes one pretty-printed JSON file per build: `<dir>/<id>.json`
#[derive(Debug, Clone)]
pub struct JsonBuildStore {
    dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredBuild {
    id: BuildId,
    #[serde(flatten)]
    record: BuildRecord,
}

impl JsonBuildStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &BuildId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub async fn load(&self, id: &BuildId) -> Result<BuildRecord, StoreError> {
        let bytes = tokio::fs::read(self.path_for(id)).await?;
        let stored: StoredBuild = serde_json::from_slice(&bytes)?;
        Ok(stored.record)
    }
}

#[async_trait]
impl BuildStore for JsonBuildStore {
    async fn create(&self, record: BuildRecord) -> Result<BuildId, StoreError> {
        let id = BuildId::new(uuid::Uuid::new_v4().to_string());
        let stored = StoredBuild {
            id: id.clone(),
            record,
        };

        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(&stored)?;
        tokio::fs::write(self.path_for(&id), json).await?;

        tracing::debug!(id = %id, dir = %self.dir.display(), "stored build record");
        Ok(id)
    }
}

/// Keeps build records in memory
#[derive(Debug, Default)]
pub struct MemoryBuildStore {
    records: Mutex<Vec<(BuildId, BuildRecord)>>,
}

impl MemoryBuildStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(BuildId, BuildRecord)> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl BuildStore for MemoryBuildStore {
    async fn create(&self, record: BuildRecord) -> Result<BuildId, StoreError> {
        let mut records = self.records.lock();
        let id = BuildId::new(format!("build-{}", records.len() + 1));
        records.push((id.clone(), record));
        Ok(id)
    }
}
