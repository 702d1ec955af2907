//! Media lookup and download abstraction.
//!
//! The core never touches the filesystem or the network directly when it
//! needs an attachment's audio file. It asks a [`MediaStore`] where the file
//! would live locally, whether it is already there, and to fetch it when it
//! is not. Paths and URLs are opaque strings passed straight through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Audio media attached to a chat message.
///
/// Immutable for the lifetime of a render. `id` is the owning message's
/// identifier and doubles as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Identifier of the owning message.
    pub id: String,
    /// Absolute or server-relative URL of the audio file, when present.
    pub remote_url: Option<String>,
    /// MIME type reported by the server (e.g. `audio/mpeg`).
    pub mime_type: Option<String>,
    /// Caption rendered above the player.
    pub description: Option<String>,
}

impl Attachment {
    pub fn new(id: impl Into<String>, remote_url: Option<String>) -> Self {
        Self {
            id: id.into(),
            remote_url,
            mime_type: None,
            description: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Where an attachment's file lives locally and whether it is already cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResolution {
    /// Destination path for the file, whether or not it exists yet.
    pub local_path: String,
    pub exists: bool,
}

impl CacheResolution {
    pub fn hit(local_path: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            exists: true,
        }
    }

    pub fn miss(local_path: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            exists: false,
        }
    }
}

/// Credentials the server expects on media download URLs.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub token: String,
}

impl AuthContext {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }

    /// Append percent-encoded `rc_uid`/`rc_token` query parameters to `url`.
    pub fn authorize_url(&self, url: &str) -> String {
        let separator = if url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}rc_uid={}&rc_token={}",
            url,
            separator,
            urlencoding::encode(&self.user_id),
            urlencoding::encode(&self.token)
        )
    }
}

/// `file://` URI for a local media path, the form every engine is handed.
///
/// Values that already carry the `file://` scheme are returned unchanged.
pub fn file_uri(path: &str) -> String {
    if path.starts_with("file://") {
        return path.to_string();
    }
    let path = path.replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("user_id", &self.user_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Local media cache plus download transport.
///
/// # Errors
///
/// `download` fails with [`BridgeError::Network`](crate::BridgeError::Network)
/// when the remote fetch fails and
/// [`BridgeError::Filesystem`](crate::BridgeError::Filesystem) when the file
/// cannot be written. A failed download must not leave a file at
/// `destination` that a later `resolve` would report as existing.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Compute the local path for an attachment and report whether a file is
    /// already present there.
    async fn resolve(&self, attachment_id: &str, mime_type: Option<&str>)
        -> Result<CacheResolution>;

    /// Fetch `url` into `destination` and return the local URI to load
    /// (see [`file_uri`]).
    ///
    /// Implementations apply `auth` to the request themselves.
    async fn download(&self, url: &str, destination: &str, auth: &AuthContext) -> Result<String>;
}
