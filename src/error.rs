//! Error types for Darkroom
//!
//! All modules use `DarkroomResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Darkroom operations
pub type DarkroomResult<T> = Result<T, DarkroomError>;

/// All errors that can occur in Darkroom
#[derive(Error, Debug)]
pub enum DarkroomError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid site origin '{origin}': {reason}")]
    OriginInvalid { origin: String, reason: String },

    // Request errors
    #[error("Invalid URL '{url}': {reason}")]
    UrlInvalid { url: String, reason: String },

    // Lifecycle errors
    #[error("Install failed for shell asset {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    // Network errors
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    // Store errors
    #[error("Failed to open cache partition {name}: {reason}")]
    PartitionOpen { name: String, reason: String },

    #[error("Cache partition not found: {0}")]
    PartitionNotFound(String),

    #[error("Cache store rejected write for {identity}: {reason}")]
    StoreWrite { identity: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DarkroomError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fetch error
    pub fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error is recoverable inside the retrieval path.
    ///
    /// Recoverable errors are masked from the page: a failed fetch becomes
    /// a 503, a failed store write is logged and dropped. Everything else
    /// surfaces to the embedder through the lifecycle methods.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::StoreWrite { .. } | Self::PartitionNotFound(_)
        )
    }
}
