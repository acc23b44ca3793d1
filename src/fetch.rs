//! Network fetch abstraction
//!
//! The retriever and the lifecycle both fetch through the [`Fetcher`]
//! trait, so tests can substitute stub fetchers and embedders can plug
//! in their own transport.

use crate::config::Config;
use crate::error::{DarkroomError, DarkroomResult};
use crate::request::{Method, Request, Response};
use async_trait::async_trait;
use std::time::Duration;
use ureq::Agent;

/// Responses larger than this are treated as fetch failures rather than
/// silently truncated.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Abstract network fetch
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a request, resolving to a response snapshot or a fetch error
    async fn fetch(&self, request: &Request) -> DarkroomResult<Response>;
}

/// Production fetcher backed by a blocking ureq agent
///
/// Non-2xx statuses are returned as responses, not errors; the caller
/// decides what is cacheable.
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Create a fetcher with an optional global per-request timeout.
    /// `None` matches the original behavior: a hung fetch stays pending.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build();
        Self {
            agent: Agent::new_with_config(config),
        }
    }

    /// Create a fetcher honoring `fetch_timeout_secs` from the config
    pub fn from_config(config: &Config) -> Self {
        Self::with_timeout(config.fetch_timeout_secs.map(Duration::from_secs))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> DarkroomResult<Response> {
        if request.method() != Method::Get {
            return Err(DarkroomError::fetch(
                request.url().as_str(),
                format!("unsupported method {}", request.method()),
            ));
        }

        let agent = self.agent.clone();
        let url = request.url().to_string();

        // ureq is blocking; run the call off the async worker threads
        tokio::task::spawn_blocking(move || -> DarkroomResult<Response> {
            let mut resp = agent
                .get(&url)
                .call()
                .map_err(|e| DarkroomError::fetch(&url, e.to_string()))?;

            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = resp
                .body_mut()
                .with_config()
                .limit(MAX_BODY_BYTES)
                .read_to_vec()
                .map_err(|e| DarkroomError::fetch(&url, e.to_string()))?;

            Ok(Response {
                status,
                headers,
                body,
            })
        })
        .await
        .map_err(|e| DarkroomError::Internal(format!("fetch task failed: {}", e)))?
    }
}
