//! Request routing
//!
//! Classifies every intercepted request. Only same-origin GET requests
//! under the photo prefix are handled by the cache; everything else
//! passes through to normal network handling unmodified.

use crate::request::{Method, Request};
use url::Url;

/// Routing decision for an intercepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Serve through the stale-while-revalidate retriever
    PhotoAsset,
    /// Do not intercept
    PassThrough,
}

/// Classify a request against the site origin and photo path prefix.
///
/// Rules, in order: non-GET methods pass through; cross-origin requests
/// pass through; same-origin GETs outside the prefix pass through.
pub fn route(request: &Request, site_origin: &Url, photo_prefix: &str) -> Route {
    if request.method() != Method::Get {
        return Route::PassThrough;
    }

    if request.url().origin() != site_origin.origin() {
        return Route::PassThrough;
    }

    if !request.url().path().starts_with(photo_prefix) {
        return Route::PassThrough;
    }

    Route::PhotoAsset
}
