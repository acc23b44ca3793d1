//! In-memory cache store
//!
//! Partitions are insertion-ordered vectors behind an async mutex. Linear
//! scans are fine at the scale of a photo cache (entry counts in the low
//! hundreds).

use crate::error::DarkroomResult;
use crate::request::Response;
use crate::store::{CachePartition, CacheStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory store; partitions live for the lifetime of the store
#[derive(Default)]
pub struct MemoryStore {
    partitions: Mutex<HashMap<String, Arc<MemoryPartition>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, name: &str) -> DarkroomResult<Arc<dyn CachePartition>> {
        let mut partitions = self.partitions.lock().await;
        let partition = partitions
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(MemoryPartition {
                    name: name.to_string(),
                    entries: Mutex::new(Vec::new()),
                })
            })
            .clone();
        Ok(partition)
    }

    async fn partition_names(&self) -> DarkroomResult<Vec<String>> {
        let partitions = self.partitions.lock().await;
        let mut names: Vec<String> = partitions.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_partition(&self, name: &str) -> DarkroomResult<bool> {
        let mut partitions = self.partitions.lock().await;
        Ok(partitions.remove(name).is_some())
    }
}

/// One in-memory partition; entries kept in insertion order
pub struct MemoryPartition {
    name: String,
    entries: Mutex<Vec<(String, Response)>>,
}

#[async_trait]
impl CachePartition for MemoryPartition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, identity: &str) -> DarkroomResult<Option<Response>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .find(|(id, _)| id == identity)
            .map(|(_, response)| response.clone()))
    }

    async fn put(&self, identity: &str, response: Response) -> DarkroomResult<()> {
        let mut entries = self.entries.lock().await;
        if let Some(slot) = entries.iter_mut().find(|(id, _)| id == identity) {
            slot.1 = response;
        } else {
            entries.push((identity.to_string(), response));
        }
        Ok(())
    }

    async fn delete(&self, identity: &str) -> DarkroomResult<bool> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|(id, _)| id != identity);
        Ok(entries.len() != before)
    }

    async fn identities(&self) -> DarkroomResult<Vec<String>> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().map(|(id, _)| id.clone()).collect())
    }
}
