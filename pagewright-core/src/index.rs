//! Source indexing.
//!
//! The indexer walks a [`Disk`] once per build and keeps a snapshot of the
//! nodes it found. Only one index pass may run at a time against a given
//! indexer; concurrent callers wait for the permit.

use crate::disk::Disk;
use pagewright_types::FileNode;
use parking_lot::RwLock;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Source {} is unreadable: {source}", .root.display())]
    Unreadable {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Indexer has been shut down")]
    Closed,
}

pub struct SourceIndexer {
    disk: Arc<dyn Disk>,
    root: PathBuf,
    permit: Semaphore,
    nodes: RwLock<Arc<[FileNode]>>,
}

impl SourceIndexer {
    pub fn new(disk: Arc<dyn Disk>, root: impl Into<PathBuf>) -> Self {
        Self {
            disk,
            root: root.into(),
            permit: Semaphore::new(1),
            nodes: RwLock::new(Arc::from(Vec::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn disk(&self) -> &Arc<dyn Disk> {
        &self.disk
    }

    /// Re-index the source tree, returning the number of nodes found
    pub async fn index(&self) -> Result<usize, IndexError> {
        let _permit = self.permit.acquire().await.map_err(|_| IndexError::Closed)?;

        tracing::debug!(root = %self.root.display(), "indexing source");
        let nodes = self
            .disk
            .walk(&self.root)
            .await
            .map_err(|source| IndexError::Unreadable {
                root: self.root.clone(),
                source,
            })?;

        let count = nodes.len();
        *self.nodes.write() = Arc::from(nodes);
        tracing::debug!(root = %self.root.display(), count, "indexed source");
        Ok(count)
    }

    /// Lazily iterate the last snapshot, keeping nodes matching `predicate`
    pub fn nodes<P>(&self, predicate: P) -> Nodes<P>
    where
        P: FnMut(&FileNode) -> bool,
    {
        Nodes {
            snapshot: self.nodes.read().clone(),
            position: 0,
            predicate,
        }
    }

    /// Files only, paired with their path relative to the root
    pub fn files(&self) -> impl Iterator<Item = (FileNode, PathBuf)> + '_ {
        self.nodes(FileNode::is_file).filter_map(move |node| {
            let relative = node.relative_to(&self.root)?.to_path_buf();
            Some((node, relative))
        })
    }
}

/// Single-pass traversal over an index snapshot
pub struct Nodes<P> {
    snapshot: Arc<[FileNode]>,
    position: usize,
    predicate: P,
}

impl<P> Iterator for Nodes<P>
where
    P: FnMut(&FileNode) -> bool,
{
    type Item = FileNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.snapshot.get(self.position) {
            self.position += 1;
            if (self.predicate)(node) {
                return Some(node.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemoryDisk;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Disk whose walk takes a while and records overlapping calls
    struct SlowDisk {
        inner: MemoryDisk,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    #[async_trait]
    impl Disk for SlowDisk {
        fn id(&self) -> &str {
            self.inner.id()
        }

        async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.inner.read(path).await
        }

        async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
            self.inner.write(path, contents).await
        }

        async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            self.inner.create_dir_all(path).await
        }

        async fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path).await
        }

        async fn walk(&self, root: &Path) -> io::Result<Vec<FileNode>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let result = self.inner.walk(root).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    fn sample_disk() -> MemoryDisk {
        let disk = MemoryDisk::new("mem");
        disk.insert_file("/site/index.md", "# Home");
        disk.insert_file("/site/posts/a.md", "A");
        disk.insert_file("/site/img/logo.png", [0u8, 1, 2]);
        disk
    }

    #[tokio::test]
    async fn test_index_and_filter() {
        let indexer = SourceIndexer::new(Arc::new(sample_disk()), "/site");
        assert_eq!(indexer.nodes(|_| true).count(), 0);

        let count = indexer.index().await.unwrap();
        assert_eq!(count, 5);

        let files: Vec<PathBuf> = indexer.files().map(|(_, rel)| rel).collect();
        assert_eq!(files.len(), 3);
        assert!(files.contains(&PathBuf::from("posts/a.md")));

        let dirs = indexer.nodes(FileNode::is_dir).count();
        assert_eq!(dirs, 2);
    }

    #[tokio::test]
    async fn test_index_is_idempotent() {
        let indexer = SourceIndexer::new(Arc::new(sample_disk()), "/site");
        let first = indexer.index().await.unwrap();
        let second = indexer.index().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(indexer.nodes(|_| true).count(), first);
    }

    #[tokio::test]
    async fn test_unreadable_source_fails() {
        let indexer = SourceIndexer::new(Arc::new(MemoryDisk::new("mem")), "/missing");
        let err = indexer.index().await.unwrap_err();
        assert!(matches!(err, IndexError::Unreadable { .. }));
        assert!(err.to_string().contains("/missing"));
    }

    #[tokio::test]
    async fn test_concurrent_index_passes_do_not_interleave() {
        let disk = Arc::new(SlowDisk {
            inner: sample_disk(),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        });
        let indexer = Arc::new(SourceIndexer::new(disk.clone(), "/site"));

        let a = tokio::spawn({
            let indexer = indexer.clone();
            async move { indexer.index().await }
        });
        let b = tokio::spawn({
            let indexer = indexer.clone();
            async move { indexer.index().await }
        });

        assert_eq!(a.await.unwrap().unwrap(), 5);
        assert_eq!(b.await.unwrap().unwrap(), 5);
        assert_eq!(disk.max_active.load(Ordering::SeqCst), 1);
    }
}
