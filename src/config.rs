//! Configuration for the cache controller
//!
//! Configuration is optional: the defaults reproduce the site's shipped
//! behavior (version `v1`, 80 cached images, the four shell files). A
//! TOML file can override any field.

use crate::error::{DarkroomError, DarkroomResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Cache controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version tag embedded in partition names; bump on deploy to
    /// invalidate every prior generation at activation
    pub version_tag: String,

    /// The site's own origin; requests from other origins pass through
    pub site_origin: String,

    /// Path prefix under which photo assets are cached
    pub photo_prefix: String,

    /// Maximum number of entries kept in the images partition
    pub max_image_entries: usize,

    /// Shell asset paths written into the shell partition at install
    pub shell_files: Vec<String>,

    /// Optional global timeout for network fetches, in seconds.
    /// Off by default: a hung fetch leaves the miss path suspended.
    pub fetch_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version_tag: "v1".to_string(),
            site_origin: "http://localhost:4321".to_string(),
            photo_prefix: "/photos/".to_string(),
            max_image_entries: 80,
            shell_files: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/style.css".to_string(),
                "/script.js".to_string(),
            ],
            fetch_timeout_secs: None,
        }
    }
}

impl Config {
    /// Name of the current shell partition
    pub fn shell_partition(&self) -> String {
        format!("shell-{}", self.version_tag)
    }

    /// Name of the current images partition
    pub fn images_partition(&self) -> String {
        format!("images-{}", self.version_tag)
    }

    /// Default directory for the disk-backed store
    pub fn default_store_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("darkroom")
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> DarkroomResult<Self> {
        if !path.exists() {
            return Err(DarkroomError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| DarkroomError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| DarkroomError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}
