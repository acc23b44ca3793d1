//! FIFO eviction policy
//!
//! Runs after every successful cache write. Reads the partition's
//! insertion-ordered identities and deletes the oldest ones until the
//! count is back under the limit. No timestamps, no recency tracking:
//! insertion order is the only signal.

use crate::store::CachePartition;
use tracing::{debug, warn};

/// Enforce a maximum entry count on a partition, oldest-first.
///
/// Returns the number of entries actually removed. Failures are
/// tolerated: a failed read aborts the pass with zero removals, a failed
/// delete skips that entry and continues. Neither ever propagates to the
/// write that triggered eviction.
///
/// Because this runs per-write rather than batched, concurrent in-flight
/// writes can transiently push the partition above the limit.
pub async fn enforce_entry_limit(partition: &dyn CachePartition, max_entries: usize) -> usize {
    let identities = match partition.identities().await {
        Ok(ids) => ids,
        Err(e) => {
            warn!("Skipping eviction on {}: {}", partition.name(), e);
            return 0;
        }
    };

    if identities.len() <= max_entries {
        return 0;
    }

    let overflow = identities.len() - max_entries;
    let mut removed = 0;
    for identity in identities.iter().take(overflow) {
        match partition.delete(identity).await {
            Ok(_) => removed += 1,
            Err(e) => {
                warn!("Failed to evict {} from {}: {}", identity, partition.name(), e);
            }
        }
    }

    debug!(
        "Evicted {}/{} oldest entries from {}",
        removed,
        overflow,
        partition.name()
    );
    removed
}
