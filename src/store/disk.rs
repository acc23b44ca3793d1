//! Disk-backed cache store
//!
//! Layout: one directory per partition under the store root. Each entry
//! is a JSON snapshot file named by the SHA-256 of its identity, so any
//! identity maps to a filesystem-safe name. An `index.json` per
//! partition records insertion order; it is the ordering the eviction
//! policy reads.
//!
//! A per-partition async mutex serializes index updates. Entry writes
//! are atomic single-file operations; there are no multi-file
//! transactions.

use crate::error::{DarkroomError, DarkroomResult};
use crate::request::Response;
use crate::store::{CachePartition, CacheStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Disk-backed store rooted at a directory
pub struct DiskStore {
    root: PathBuf,
    partitions: Mutex<HashMap<String, Arc<DiskPartition>>>,
}

impl DiskStore {
    /// Create a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            partitions: Mutex::new(HashMap::new()),
        }
    }

    /// The store's root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn open(&self, name: &str) -> DarkroomResult<Arc<dyn CachePartition>> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| DarkroomError::PartitionOpen {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        let mut partitions = self.partitions.lock().await;
        let partition = partitions
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(DiskPartition {
                    name: name.to_string(),
                    dir,
                    lock: Mutex::new(()),
                })
            })
            .clone();
        Ok(partition)
    }

    async fn partition_names(&self) -> DarkroomResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| DarkroomError::io(format!("reading store root {}", self.root.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DarkroomError::io("iterating store root", e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| DarkroomError::io("checking partition dir type", e))?
                .is_dir();
            if is_dir {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn delete_partition(&self, name: &str) -> DarkroomResult<bool> {
        let mut partitions = self.partitions.lock().await;
        partitions.remove(name);

        let dir = self.root.join(name);
        if !dir.exists() {
            return Ok(false);
        }

        fs::remove_dir_all(&dir)
            .await
            .map_err(|e| DarkroomError::io(format!("deleting partition {}", dir.display()), e))?;
        debug!("Deleted partition directory {}", dir.display());
        Ok(true)
    }
}

/// A persisted snapshot plus the metadata needed to rebuild an entry.
/// `stored_at` is informational only; eviction never reads it.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    identity: String,
    stored_at: DateTime<Utc>,
    response: Response,
}

/// One on-disk partition
pub struct DiskPartition {
    name: String,
    dir: PathBuf,
    lock: Mutex<()>,
}

impl DiskPartition {
    /// Content-addressed file name for an identity
    fn entry_path(&self, identity: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(identity.as_bytes()));
        self.dir.join(format!("{}.json", digest))
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("index.json")
    }

    async fn read_index(&self) -> DarkroomResult<Vec<String>> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| DarkroomError::io(format!("reading index {}", path.display()), e))?;
        let index: Vec<String> = serde_json::from_str(&content)?;
        Ok(index)
    }

    async fn write_index(&self, index: &[String]) -> DarkroomResult<()> {
        let path = self.index_path();
        let content = serde_json::to_string(index)?;
        fs::write(&path, content)
            .await
            .map_err(|e| DarkroomError::io(format!("writing index {}", path.display()), e))
    }
}

#[async_trait]
impl CachePartition for DiskPartition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, identity: &str) -> DarkroomResult<Option<Response>> {
        let _guard = self.lock.lock().await;

        // Index membership is authoritative: an entry absent from the
        // index is invisible to eviction and is not served either
        let index = self.read_index().await?;
        if !index.iter().any(|id| id == identity) {
            return Ok(None);
        }

        let path = self.entry_path(identity);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| DarkroomError::io(format!("reading entry {}", path.display()), e))?;
        let entry: StoredEntry = serde_json::from_str(&content)?;
        Ok(Some(entry.response))
    }

    async fn put(&self, identity: &str, response: Response) -> DarkroomResult<()> {
        let _guard = self.lock.lock().await;

        let entry = StoredEntry {
            identity: identity.to_string(),
            stored_at: Utc::now(),
            response,
        };

        let path = self.entry_path(identity);
        let content = serde_json::to_string(&entry)?;
        fs::write(&path, content)
            .await
            .map_err(|e| DarkroomError::io(format!("writing entry {}", path.display()), e))?;

        let mut index = self.read_index().await?;
        if !index.iter().any(|id| id == identity) {
            index.push(identity.to_string());
            self.write_index(&index).await?;
        }
        Ok(())
    }

    async fn delete(&self, identity: &str) -> DarkroomResult<bool> {
        let _guard = self.lock.lock().await;

        let path = self.entry_path(identity);
        let existed = path.exists();
        if existed {
            fs::remove_file(&path)
                .await
                .map_err(|e| DarkroomError::io(format!("deleting entry {}", path.display()), e))?;
        }

        let mut index = self.read_index().await?;
        let before = index.len();
        index.retain(|id| id != identity);
        if index.len() != before {
            self.write_index(&index).await?;
        }
        Ok(existed)
    }

    async fn identities(&self) -> DarkroomResult<Vec<String>> {
        let _guard = self.lock.lock().await;
        self.read_index().await
    }
}
