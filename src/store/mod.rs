//! Durable snapshot storage for tool state.
//!
//! A store holds exactly one document. Callers load it whole, mutate their
//! in-memory copy and save the whole snapshot back.


use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Refusing to overwrite {location}, it could not be loaded: {reason}")]
    Unloaded { location: String, reason: String },
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Load/save access to a single snapshot document
pub trait SnapshotStore<T> {
    /// Read the current snapshot; `None` when nothing has been stored yet
    fn load(&self) -> Result<Option<T>, StoreError>;

    /// Replace the stored snapshot
    fn save(&mut self, snapshot: &T) -> Result<(), StoreError>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// JSON file store. Writes go to a temporary file in the same directory
/// which is then renamed over the target, so readers in other processes see
/// either the old or the new document, never a partial one.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomically(&self, bytes: &[u8]) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl<T> SnapshotStore<T> for JsonFileStore
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<Option<T>, StoreError> {
        if !self.path.exists() {
            info!("Store file not found at {}, starting empty", self.path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        if content.trim().is_empty() {
            info!("Store file {} is empty, starting empty", self.path.display());
            return Ok(None);
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&mut self, snapshot: &T) -> Result<(), StoreError> {
        let bytes = to_pretty_json(snapshot)?;
        self.write_atomically(&bytes)
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        debug!("Saved snapshot to {}", self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory store for tests and runs that should not touch disk
#[derive(Debug, Clone, Default)]
pub struct MemoryStore<T> {
    snapshot: Option<T>,
}

impl<T> MemoryStore<T> {
    #[inline]
    pub fn new() -> Self {
        Self { snapshot: None }
    }

    #[inline]
    pub fn with_snapshot(snapshot: T) -> Self {
        Self {
            snapshot: Some(snapshot),
        }
    }
}

impl<T: Clone> SnapshotStore<T> for MemoryStore<T> {
    fn load(&self) -> Result<Option<T>, StoreError> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &T) -> Result<(), StoreError> {
        self.snapshot = Some(snapshot.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

/// Serialize with four-space indentation, keeping non-ASCII text as UTF-8
#[inline]
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    value.serialize(&mut serializer)?;
    Ok(bytes)
}
