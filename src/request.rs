//! Request and response snapshots
//!
//! Requests are identified by method plus normalized URL; responses are
//! immutable byte snapshots taken at write time. The controller treats
//! bodies as opaque and never inspects image data.

use crate::error::{DarkroomError, DarkroomResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// HTTP method of an intercepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
        };
        write!(f, "{}", s)
    }
}

/// An intercepted network request
///
/// The URL fragment is stripped at construction: two requests that differ
/// only by fragment share one cache identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Url,
}

impl Request {
    /// Create a request, normalizing the URL
    pub fn new(method: Method, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method, url }
    }

    /// Create a GET request from a URL string
    pub fn get(url: &str) -> DarkroomResult<Self> {
        let parsed = Url::parse(url).map_err(|e| DarkroomError::UrlInvalid {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(Method::Get, parsed))
    }

    /// Create a request with an explicit method from a URL string
    pub fn with_method(method: Method, url: &str) -> DarkroomResult<Self> {
        let parsed = Url::parse(url).map_err(|e| DarkroomError::UrlInvalid {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(method, parsed))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Cache key for this request: method plus normalized URL
    pub fn identity(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// An immutable response snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code
    pub status: u16,

    /// Response headers as received
    pub headers: Vec<(String, String)>,

    /// Response body bytes
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with a body and no headers
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    /// Synthetic failure response returned when a miss cannot be served
    pub fn service_unavailable() -> Self {
        Self::new(503, Vec::new())
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether this snapshot may be written to a partition.
    ///
    /// Only a full 200 response qualifies: a 206 partial body would be
    /// replayed as a complete one, and 204 has no body worth keeping.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    /// Look up a header by name, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
