//! Stale-while-revalidate retrieval
//!
//! A cached snapshot is returned immediately while a background task
//! refreshes it from the network; a miss waits for the network and falls
//! back to a synthesized 503. Background write failures are swallowed:
//! the page never observes an error from this path.

use crate::evict;
use crate::fetch::Fetcher;
use crate::request::{Request, Response};
use crate::store::CachePartition;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Result of running the retriever for one request
pub struct RetrieveOutcome {
    /// The response handed to the page
    pub response: Response,

    /// Handle of the spawned background cache write, when one was
    /// started. Nothing awaits it in the serving path; tests and
    /// embedders can use it to wait for quiescence.
    pub refresh: Option<JoinHandle<()>>,
}

/// Serve a routed request from the partition, revalidating in the
/// background. `max_entries` bounds the partition after each write.
pub async fn stale_while_revalidate(
    partition: Arc<dyn CachePartition>,
    fetcher: Arc<dyn Fetcher>,
    request: Request,
    max_entries: usize,
) -> RetrieveOutcome {
    let identity = request.identity();

    // A failed read is served as a miss, not an error
    let cached = match partition.lookup(&identity).await {
        Ok(cached) => cached,
        Err(e) => {
            warn!("Cache read failed for {}: {}", identity, e);
            None
        }
    };

    if let Some(response) = cached {
        debug!("Cache hit for {}", identity);
        let refresh = tokio::spawn(refresh_entry(partition, fetcher, request, max_entries));
        return RetrieveOutcome {
            response,
            refresh: Some(refresh),
        };
    }

    debug!("Cache miss for {}", identity);
    match fetcher.fetch(&request).await {
        Ok(response) if response.is_cacheable() => {
            let write = tokio::spawn(write_entry(
                partition,
                identity,
                response.clone(),
                max_entries,
            ));
            RetrieveOutcome {
                response,
                refresh: Some(write),
            }
        }
        // Anything but a full 200 goes to the page as-is, never cached
        Ok(response) => RetrieveOutcome {
            response,
            refresh: None,
        },
        Err(e) => {
            debug!("Network fetch failed for {}: {}", identity, e);
            RetrieveOutcome {
                response: Response::service_unavailable(),
                refresh: None,
            }
        }
    }
}

/// Background revalidation after a cache hit
async fn refresh_entry(
    partition: Arc<dyn CachePartition>,
    fetcher: Arc<dyn Fetcher>,
    request: Request,
    max_entries: usize,
) {
    let identity = request.identity();
    match fetcher.fetch(&request).await {
        Ok(response) if response.is_cacheable() => {
            write_entry(partition, identity, response, max_entries).await;
        }
        Ok(response) => {
            debug!("Not refreshing {} from status {}", identity, response.status);
        }
        Err(e) => {
            debug!("Background refresh failed for {}: {}", identity, e);
        }
    }
}

/// Write an entry and enforce the size limit; errors are logged only
async fn write_entry(
    partition: Arc<dyn CachePartition>,
    identity: String,
    response: Response,
    max_entries: usize,
) {
    if let Err(e) = partition.put(&identity, response).await {
        warn!("Cache write failed for {}: {}", identity, e);
        return;
    }
    evict::enforce_entry_limit(&*partition, max_entries).await;
}
