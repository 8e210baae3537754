//! Disk abstraction used for both the source and the destination of a build.
//!
//! The pipeline never touches `std::fs` directly: everything goes through a
//! [`Disk`], so the same build can run against the local filesystem or an
//! in-memory tree.

use async_trait::async_trait;
use pagewright_types::{FileNode, NodeKind};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[async_trait]
pub trait Disk: Send + Sync {
    /// Stable identifier, recorded with persisted builds
    fn id(&self) -> &str;

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Create `path` and all missing parents. Succeeds if it already exists.
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    async fn exists(&self, path: &Path) -> bool;

    /// Every entry below `root` (not `root` itself) in a deterministic order.
    ///
    /// Fails if `root` is missing or cannot be read.
    async fn walk(&self, root: &Path) -> io::Result<Vec<FileNode>>;
}

/// Disk backed by the local filesystem
#[derive(Debug, Clone)]
pub struct LocalDisk {
    id: String,
}

impl LocalDisk {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Default for LocalDisk {
    fn default() -> Self {
        Self::new("local")
    }
}

#[async_trait]
impl Disk for LocalDisk {
    fn id(&self) -> &str {
        &self.id
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, contents).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn walk(&self, root: &Path) -> io::Result<Vec<FileNode>> {
        let metadata = tokio::fs::metadata(root).await?;
        if !metadata.is_dir() {
            return Err(io::Error::other(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let mut nodes = Vec::new();
            for entry in WalkDir::new(&root).min_depth(1).sort_by_file_name() {
                let entry = entry.map_err(io::Error::from)?;
                let kind = if entry.file_type().is_dir() {
                    NodeKind::Dir
                } else {
                    NodeKind::File
                };
                nodes.push(FileNode::new(entry.into_path(), kind));
            }
            Ok(nodes)
        })
        .await
        .map_err(io::Error::other)?
    }
}

/// Disk held entirely in memory
///
/// Directories are tracked explicitly so that writes into a missing parent
/// fail the same way they would on a real filesystem.
#[derive(Debug, Default)]
pub struct MemoryDisk {
    id: String,
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: RwLock<BTreeSet<PathBuf>>,
}

impl MemoryDisk {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Seed a file, creating its parent directories
    pub fn insert_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.insert_dirs(parent);
        }
        self.files
            .write()
            .insert(path.to_path_buf(), contents.as_ref().to_vec());
    }

    /// Seed an (empty) directory
    pub fn insert_dir(&self, path: impl AsRef<Path>) {
        self.insert_dirs(path.as_ref());
    }

    /// Contents of a file, if present
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.read().get(path.as_ref()).cloned()
    }

    pub fn get_string(&self, path: impl AsRef<Path>) -> Option<String> {
        self.get(path).and_then(|bytes| String::from_utf8(bytes).ok())
    }

    /// All file paths under `root`, sorted
    pub fn files_under(&self, root: impl AsRef<Path>) -> Vec<PathBuf> {
        let root = root.as_ref();
        self.files
            .read()
            .keys()
            .filter(|p| p.starts_with(root))
            .cloned()
            .collect()
    }

    fn insert_dirs(&self, path: &Path) {
        let mut dirs = self.dirs.write();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.as_os_str().is_empty() || path == Path::new("/") || self.dirs.read().contains(path)
    }
}

#[async_trait]
impl Disk for MemoryDisk {
    fn id(&self) -> &str {
        &self.id
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.read().get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let parent = path.parent().unwrap_or(Path::new(""));
        if !self.dir_exists(parent) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("parent directory {} does not exist", parent.display()),
            ));
        }
        if self.dirs.read().contains(path) {
            return Err(io::Error::other(format!(
                "{} is a directory",
                path.display()
            )));
        }
        self.files
            .write()
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        if self.files.read().contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a file", path.display()),
            ));
        }
        self.insert_dirs(path);
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(path) || self.dirs.read().contains(path)
    }

    async fn walk(&self, root: &Path) -> io::Result<Vec<FileNode>> {
        if !self.dir_exists(root) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", root.display()),
            ));
        }

        let mut entries: BTreeMap<PathBuf, NodeKind> = BTreeMap::new();
        for dir in self.dirs.read().iter() {
            if dir != root && dir.starts_with(root) {
                entries.insert(dir.clone(), NodeKind::Dir);
            }
        }
        for file in self.files.read().keys() {
            if file.starts_with(root) {
                entries.insert(file.clone(), NodeKind::File);
            }
        }

        Ok(entries
            .into_iter()
            .map(|(path, kind)| FileNode::new(path, kind))
            .collect())
    }
}
