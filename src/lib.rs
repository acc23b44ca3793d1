//! Darkroom - offline asset cache for static photography portfolios
//!
//! Intercepts the site's GET requests for photo assets and serves them
//! stale-while-revalidate from versioned cache partitions, with FIFO
//! eviction and an install/activate generation lifecycle.

pub mod config;
pub mod controller;
pub mod error;
pub mod evict;
pub mod fetch;
pub mod host;
pub mod logging;
pub mod request;
pub mod retrieve;
pub mod router;
pub mod store;

pub use config::Config;
pub use controller::CacheController;
pub use error::{DarkroomError, DarkroomResult};
pub use fetch::{Fetcher, HttpFetcher};
pub use host::{NullHost, WorkerHost};
pub use request::{Method, Request, Response};
pub use retrieve::RetrieveOutcome;
pub use router::{route, Route};
pub use store::{CachePartition, CacheStore, DiskStore, MemoryStore};
