//! Storage providers
//!
//! The engine reads and writes plain text files addressed by `/`-separated
//! paths relative to a root. [`FsStorage`] maps them onto a directory with
//! `tokio::fs`; [`MemoryStorage`] keeps them in memory for tests and dry runs.

use crate::StorageError;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// An existing file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHandle {
    path: String,
}

impl FileHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Storage abstraction used by the capture engine
#[async_trait]
pub trait Storage: Send + Sync {
    /// Handle for an existing file, `None` if there is no file at `path`
    async fn exists(&self, path: &str) -> Result<Option<FileHandle>, StorageError>;

    async fn read(&self, file: &FileHandle) -> Result<String, StorageError>;

    /// Create a new file. Fails if the file exists or its folder is missing.
    async fn create(&self, path: &str, content: &str) -> Result<FileHandle, StorageError>;

    /// Replace the content of an existing file
    async fn write(&self, file: &FileHandle, content: &str) -> Result<(), StorageError>;

    /// Create a folder and its parents; succeeds if it already exists
    async fn create_folder(&self, path: &str) -> Result<(), StorageError>;
}

/// Files under a root directory
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(StorageError::OutsideRoot(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn exists(&self, path: &str) -> Result<Option<FileHandle>, StorageError> {
        let full = self.resolve(path)?;
        match fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => Ok(Some(FileHandle::new(path))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn read(&self, file: &FileHandle) -> Result<String, StorageError> {
        let full = self.resolve(file.path())?;
        fs::read_to_string(&full).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(file.path().to_string()),
            _ => StorageError::io(file.path(), e),
        })
    }

    async fn create(&self, path: &str, content: &str) -> Result<FileHandle, StorageError> {
        let full = self.resolve(path)?;
        let mut handle = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_string()),
                _ => StorageError::io(path, e),
            })?;
        handle
            .write_all(content.as_bytes())
            .await
            .map_err(|e| StorageError::io(path, e))?;
        handle.flush().await.map_err(|e| StorageError::io(path, e))?;
        debug!(path, "Created file");
        Ok(FileHandle::new(path))
    }

    async fn write(&self, file: &FileHandle, content: &str) -> Result<(), StorageError> {
        let full = self.resolve(file.path())?;
        fs::write(&full, content)
            .await
            .map_err(|e| StorageError::io(file.path(), e))
    }

    async fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        fs::create_dir_all(&full)
            .await
            .map_err(|e| StorageError::io(path, e))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<String, String>,
    folders: BTreeSet<String>,
    failing_creates: BTreeSet<String>,
}

/// In-memory files. Clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file
    pub fn with_file(self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.lock().files.insert(path.into(), content.into());
        self
    }

    /// Make every `create` of `path` fail
    pub fn fail_create(self, path: impl Into<String>) -> Self {
        self.lock().failing_creates.insert(path.into());
        self
    }

    /// Current content of a file
    pub fn file(&self, path: &str) -> Option<String> {
        self.lock().files.get(path).cloned()
    }

    pub fn has_folder(&self, path: &str) -> bool {
        self.lock().folders.contains(path.trim_end_matches('/'))
    }

    /// Created folders, sorted
    pub fn folders(&self) -> Vec<String> {
        self.lock().folders.iter().cloned().collect()
    }

    /// Paths of all files, sorted
    pub fn paths(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, path: &str) -> Result<Option<FileHandle>, StorageError> {
        Ok(self
            .lock()
            .files
            .contains_key(path)
            .then(|| FileHandle::new(path)))
    }

    async fn read(&self, file: &FileHandle) -> Result<String, StorageError> {
        self.file(file.path())
            .ok_or_else(|| StorageError::NotFound(file.path().to_string()))
    }

    async fn create(&self, path: &str, content: &str) -> Result<FileHandle, StorageError> {
        let mut state = self.lock();
        if state.failing_creates.contains(path) {
            return Err(StorageError::CreateFailed(path.to_string()));
        }
        if state.files.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        state.files.insert(path.to_string(), content.to_string());
        Ok(FileHandle::new(path))
    }

    async fn write(&self, file: &FileHandle, content: &str) -> Result<(), StorageError> {
        let mut state = self.lock();
        match state.files.get_mut(file.path()) {
            Some(existing) => {
                *existing = content.to_string();
                Ok(())
            }
            None => Err(StorageError::NotFound(file.path().to_string())),
        }
    }

    async fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        self.lock()
            .folders
            .insert(path.trim_end_matches('/').to_string());
        Ok(())
    }
}
