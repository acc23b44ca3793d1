//! Cache controller lifecycle and dispatch
//!
//! One stateless controller per worker generation. `install` populates
//! the shell partition, `activate` prunes prior generations, `handle`
//! serves intercepted requests. The controller owns no mutable state;
//! the store is the only shared resource between concurrent requests.

use crate::config::Config;
use crate::error::{DarkroomError, DarkroomResult};
use crate::fetch::Fetcher;
use crate::host::{NullHost, WorkerHost};
use crate::request::{Method, Request, Response};
use crate::retrieve::{stale_while_revalidate, RetrieveOutcome};
use crate::router::{route, Route};
use crate::store::CacheStore;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Offline asset cache controller for one worker generation
pub struct CacheController {
    config: Config,
    origin: Url,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    host: Arc<dyn WorkerHost>,
}

impl CacheController {
    /// Create a controller; validates the configured site origin
    pub fn new(
        config: Config,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn WorkerHost>,
    ) -> DarkroomResult<Self> {
        let origin = Url::parse(&config.site_origin).map_err(|e| DarkroomError::OriginInvalid {
            origin: config.site_origin.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            config,
            origin,
            store,
            fetcher,
            host,
        })
    }

    /// Create a controller without generation-handover hooks
    pub fn with_null_host(
        config: Config,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> DarkroomResult<Self> {
        Self::new(config, store, fetcher, Arc::new(NullHost))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Install this generation: pre-populate the shell partition.
    ///
    /// Every shell asset is fetched before anything is written, so a
    /// single failed fetch fails the whole install and leaves no partial
    /// shell behind. On success the host is asked to skip the waiting
    /// period.
    pub async fn install(&self) -> DarkroomResult<()> {
        let mut snapshots = Vec::with_capacity(self.config.shell_files.len());
        for path in &self.config.shell_files {
            let url = self.origin.join(path).map_err(|e| DarkroomError::UrlInvalid {
                url: path.clone(),
                reason: e.to_string(),
            })?;
            let request = Request::new(Method::Get, url);

            let response = self.fetcher.fetch(&request).await.map_err(|e| {
                DarkroomError::InstallFailed {
                    url: request.url().to_string(),
                    reason: e.to_string(),
                }
            })?;
            if !response.is_success() {
                return Err(DarkroomError::InstallFailed {
                    url: request.url().to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            snapshots.push((request.identity(), response));
        }

        let shell = self.store.open(&self.config.shell_partition()).await?;
        for (identity, response) in snapshots {
            shell.put(&identity, response).await?;
        }

        self.host.skip_waiting().await?;
        info!(
            "Installed shell partition {} ({} assets)",
            self.config.shell_partition(),
            self.config.shell_files.len()
        );
        Ok(())
    }

    /// Activate this generation: delete every partition from prior
    /// versions, then claim open clients.
    ///
    /// The current images partition is kept even though install never
    /// creates it; it appears lazily on the first cached write.
    pub async fn activate(&self) -> DarkroomResult<()> {
        let keep = [self.config.shell_partition(), self.config.images_partition()];

        for name in self.store.partition_names().await? {
            if !keep.contains(&name) {
                self.store.delete_partition(&name).await?;
                info!("Pruned stale partition {}", name);
            }
        }

        self.host.claim_clients().await?;
        Ok(())
    }

    /// Run the full lifecycle: install, then activate
    pub async fn init(&self) -> DarkroomResult<()> {
        self.install().await?;
        self.activate().await
    }

    /// Handle an intercepted request.
    ///
    /// `None` means the request is not ours: let it pass through to
    /// normal network handling. `Some` is always a servable response;
    /// failures inside the cache path degrade to a 503, never an error.
    pub async fn handle(&self, request: &Request) -> Option<Response> {
        self.handle_with_refresh(request)
            .await
            .map(|outcome| outcome.response)
    }

    /// Like [`handle`](Self::handle), but exposes the background refresh
    /// task so callers can await cache quiescence.
    pub async fn handle_with_refresh(&self, request: &Request) -> Option<RetrieveOutcome> {
        match route(request, &self.origin, &self.config.photo_prefix) {
            Route::PassThrough => None,
            Route::PhotoAsset => {
                let partition = match self.store.open(&self.config.images_partition()).await {
                    Ok(partition) => partition,
                    Err(e) => {
                        // Treat an unopenable partition as an empty cache
                        warn!("Failed to open images partition: {}", e);
                        return Some(self.network_only(request).await);
                    }
                };

                Some(
                    stale_while_revalidate(
                        partition,
                        self.fetcher.clone(),
                        request.clone(),
                        self.config.max_image_entries,
                    )
                    .await,
                )
            }
        }
    }

    async fn network_only(&self, request: &Request) -> RetrieveOutcome {
        match self.fetcher.fetch(request).await {
            Ok(response) => RetrieveOutcome {
                response,
                refresh: None,
            },
            Err(e) => {
                debug!("Network fetch failed for {}: {}", request.identity(), e);
                RetrieveOutcome {
                    response: Response::service_unavailable(),
                    refresh: None,
                }
            }
        }
    }
}
