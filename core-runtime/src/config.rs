//! # Audio Configuration Module
//!
//! Settings shared by every mounted audio attachment.
//!
//! ## Overview
//!
//! The configuration uses a builder pattern to construct an [`AudioConfig`]
//! and validates eagerly: a config that builds is ready to use. Host
//! collaborators (media store, settings, network monitor, wake lock) are not
//! part of this struct; they are wired by the service layer.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::AudioConfig;
//! use bridge_traits::DownloadPreference;
//!
//! let config = AudioConfig::builder()
//!     .server_base_url("https://chat.example.com")
//!     .media_cache_dir("/tmp/chat-audio")
//!     .default_download_preference(DownloadPreference::Never)
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.server_host(), Some("chat.example.com"));
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::AudioConfig;
//!
//! // No server URL: relative attachment links could never be resolved.
//! AudioConfig::builder().build().expect("missing server url");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AudioSessionMode, DownloadPreference};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Initial listener capacity of a freshly created broadcast channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 4;

/// Configuration for the audio attachment core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Base URL of the chat server; relative attachment links are joined to it.
    pub server_base_url: String,

    /// Root of the local media cache. `None` lets the media store pick a
    /// platform default.
    #[serde(default)]
    pub media_cache_dir: Option<PathBuf>,

    /// Used when the user has never stored a download preference.
    #[serde(default)]
    pub default_download_preference: DownloadPreference,

    /// Audio session mode applied before every play.
    #[serde(default)]
    pub session_mode: AudioSessionMode,

    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity_hint: usize,
}

fn default_broadcast_capacity() -> usize {
    DEFAULT_BROADCAST_CAPACITY
}

impl AudioConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AudioConfigBuilder {
        AudioConfigBuilder::default()
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AudioConfig = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid audio config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.server_base_url.trim();
        if url.is_empty() {
            return Err(Error::Config(
                "server_base_url is required. Provide the chat server URL via \
                 AudioConfig::builder().server_base_url(...)"
                    .to_string(),
            ));
        }

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "server_base_url must start with http:// or https://, got '{}'",
                url
            )));
        }

        if self.server_host().is_none() {
            return Err(Error::Config(format!(
                "server_base_url has no host: '{}'",
                url
            )));
        }

        if let Some(dir) = &self.media_cache_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config(
                    "media_cache_dir cannot be empty".to_string(),
                ));
            }
        }

        if self.broadcast_capacity_hint == 0 {
            return Err(Error::Config(
                "broadcast_capacity_hint must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Host part of the server URL, without scheme, port or path.
    ///
    /// Cached media is grouped per server under this name.
    pub fn server_host(&self) -> Option<&str> {
        let rest = self
            .server_base_url
            .trim()
            .split_once("://")
            .map(|(_, rest)| rest)?;
        let authority = rest.split(['/', '?', '#']).next()?;
        let host = authority
            .rsplit_once('@')
            .map(|(_, host)| host)
            .unwrap_or(authority);
        let host = host.split(':').next()?;
        if host.is_empty() {
            None
        } else {
            Some(host)
        }
    }

    /// Server base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.server_base_url.trim().trim_end_matches('/')
    }

    pub fn media_cache_dir(&self) -> Option<&Path> {
        self.media_cache_dir.as_deref()
    }
}

/// Builder for [`AudioConfig`].
#[derive(Debug, Clone, Default)]
pub struct AudioConfigBuilder {
    server_base_url: Option<String>,
    media_cache_dir: Option<PathBuf>,
    default_download_preference: Option<DownloadPreference>,
    session_mode: Option<AudioSessionMode>,
    broadcast_capacity_hint: Option<usize>,
}

impl AudioConfigBuilder {
    pub fn server_base_url(mut self, url: impl Into<String>) -> Self {
        self.server_base_url = Some(url.into());
        self
    }

    pub fn media_cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.media_cache_dir = Some(path.into());
        self
    }

    pub fn default_download_preference(mut self, preference: DownloadPreference) -> Self {
        self.default_download_preference = Some(preference);
        self
    }

    pub fn session_mode(mut self, mode: AudioSessionMode) -> Self {
        self.session_mode = Some(mode);
        self
    }

    pub fn broadcast_capacity_hint(mut self, capacity: usize) -> Self {
        self.broadcast_capacity_hint = Some(capacity);
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the server URL is missing or malformed,
    /// the cache directory is empty, or the capacity hint is zero.
    pub fn build(self) -> Result<AudioConfig> {
        let config = AudioConfig {
            server_base_url: self.server_base_url.unwrap_or_default(),
            media_cache_dir: self.media_cache_dir,
            default_download_preference: self.default_download_preference.unwrap_or_default(),
            session_mode: self.session_mode.unwrap_or_default(),
            broadcast_capacity_hint: self
                .broadcast_capacity_hint
                .unwrap_or(DEFAULT_BROADCAST_CAPACITY),
        };
        config.validate()?;
        Ok(config)
    }
}
