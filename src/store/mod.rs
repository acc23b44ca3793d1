//! Persistent cache store abstraction
//!
//! A store holds named partitions; a partition maps request identities to
//! response snapshots and exposes them in insertion order. Insertion
//! order is the only ordering signal the eviction policy uses.
//!
//! Two backends ship with the crate:
//!
//! | Backend | Durability | Use |
//! |---------|-----------|-----|
//! | [`MemoryStore`] | process lifetime | tests, embedders with their own persistence |
//! | [`DiskStore`] | on disk | standalone deployments |

pub mod disk;
pub mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::error::DarkroomResult;
use crate::request::Response;
use async_trait::async_trait;
use std::sync::Arc;

/// A named partition of request identity to response snapshot
#[async_trait]
pub trait CachePartition: Send + Sync {
    /// The partition name, including its version tag
    fn name(&self) -> &str;

    /// Look up the snapshot stored for an identity
    async fn lookup(&self, identity: &str) -> DarkroomResult<Option<Response>>;

    /// Write or overwrite the snapshot for an identity.
    ///
    /// Overwriting keeps the identity's original insertion slot, so a
    /// refreshed entry is still evicted before younger identities.
    async fn put(&self, identity: &str, response: Response) -> DarkroomResult<()>;

    /// Remove an identity; returns whether an entry existed
    async fn delete(&self, identity: &str) -> DarkroomResult<bool>;

    /// All identities in insertion order, oldest first
    async fn identities(&self) -> DarkroomResult<Vec<String>>;
}

/// A collection of named cache partitions
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a partition, creating it if absent
    async fn open(&self, name: &str) -> DarkroomResult<Arc<dyn CachePartition>>;

    /// Names of all existing partitions
    async fn partition_names(&self) -> DarkroomResult<Vec<String>>;

    /// Delete a partition and all its entries; returns whether it existed
    async fn delete_partition(&self, name: &str) -> DarkroomResult<bool>;
}
