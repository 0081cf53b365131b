//! Storage backends for the persisted session document.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use directories::ProjectDirs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no usable data directory on this platform")]
    NoProjectDirs,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize session state: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Raw document storage. Contents are opaque JSON text; interpretation
/// (envelope, sanitization) lives above this trait.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// The stored document, or `None` when nothing has been written yet.
    async fn read(&self) -> Result<Option<String>, ConfigError>;

    async fn write(&self, contents: &str) -> Result<(), ConfigError>;
}

/// File-backed storage under the platform data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/modwatch/modbus/page-state.json` for the current user.
    pub fn at_default_path() -> Result<Self, ConfigError> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("com", "modwatch", "modwatch")
            .ok_or(ConfigError::NoProjectDirs)?;
        Ok(dirs.data_dir().join("modbus").join("page-state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn read(&self) -> Result<Option<String>, ConfigError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Temp-file-and-rename, so a crash mid-write never leaves a truncated
    /// document behind.
    async fn write(&self, contents: &str) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    contents: Mutex<Option<String>>,
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn read(&self) -> Result<Option<String>, ConfigError> {
        Ok(self.contents.lock().map_err(poisoned)?.clone())
    }

    async fn write(&self, contents: &str) -> Result<(), ConfigError> {
        *self.contents.lock().map_err(poisoned)? = Some(contents.to_owned());
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> ConfigError {
    ConfigError::Io(std::io::Error::other("storage mutex poisoned"))
}
