//! Result store - last blended result per resource
//!
//! A keyed overwrite store: no history, no versions. A record is only ever
//! handed back for the resource it was saved under.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::BlendedResult;

/// Errors from result storage
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Record for {record} cannot be saved under {key}")]
    ResourceMismatch { key: String, record: String },
}

/// Persistence of the most recent result per resource
pub trait ResultStore: Send + Sync {
    /// Create or overwrite the record for `resource_id`
    fn save(&self, resource_id: &str, result: &BlendedResult) -> Result<(), StoreError>;

    /// The record for `resource_id`, never one belonging to another resource
    fn load(&self, resource_id: &str) -> Result<Option<BlendedResult>, StoreError>;

    /// Drop the record for `resource_id` (absent is fine)
    fn clear(&self, resource_id: &str) -> Result<(), StoreError>;
}

/// Thread-safe reference to a result store
pub type SharedStore = Arc<dyn ResultStore>;

fn check_key(resource_id: &str, result: &BlendedResult) -> Result<(), StoreError> {
    if result.resource_id != resource_id {
        return Err(StoreError::ResourceMismatch {
            key: resource_id.to_string(),
            record: result.resource_id.clone(),
        });
    }
    Ok(())
}

fn matching(resource_id: &str, record: BlendedResult) -> Option<BlendedResult> {
    if record.resource_id == resource_id {
        Some(record)
    } else {
        debug!(
            "Ignoring stored record for {} (requested {})",
            record.resource_id, resource_id
        );
        None
    }
}

/// In-memory store, lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: DashMap<String, BlendedResult>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ResultStore for MemoryResultStore {
    fn save(&self, resource_id: &str, result: &BlendedResult) -> Result<(), StoreError> {
        check_key(resource_id, result)?;
        self.records.insert(resource_id.to_string(), result.clone());
        Ok(())
    }

    fn load(&self, resource_id: &str) -> Result<Option<BlendedResult>, StoreError> {
        Ok(self
            .records
            .get(resource_id)
            .and_then(|record| matching(resource_id, record.value().clone())))
    }

    fn clear(&self, resource_id: &str) -> Result<(), StoreError> {
        self.records.remove(resource_id);
        Ok(())
    }
}

/// One JSON file per resource under a directory
///
/// File names are derived from a SHA-256 of the resource id; the id inside the
/// record is still checked on load.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    dir: PathBuf,
}

impl FileResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, resource_id: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(resource_id.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        self.dir.join(format!("{}.json", &digest[..32]))
    }
}

impl ResultStore for FileResultStore {
    fn save(&self, resource_id: &str, result: &BlendedResult) -> Result<(), StoreError> {
        check_key(resource_id, result)?;
        std::fs::create_dir_all(&self.dir)?;

        let path = self.record_path(resource_id);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(result)?)?;
        std::fs::rename(&tmp, &path)?;

        debug!("Saved result for {} to {}", resource_id, path.display());
        Ok(())
    }

    fn load(&self, resource_id: &str) -> Result<Option<BlendedResult>, StoreError> {
        let bytes = match std::fs::read(self.record_path(resource_id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: BlendedResult = serde_json::from_slice(&bytes)?;
        Ok(matching(resource_id, record))
    }

    fn clear(&self, resource_id: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.record_path(resource_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
