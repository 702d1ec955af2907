//! Media cache and download using Tokio and Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{file_uri, AuthContext, CacheResolution, MediaStore},
};
use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const AUDIO_DIR: &str = "audio";
const PARTIAL_SUFFIX: &str = ".part";

/// Filesystem-backed media cache
///
/// Files live under `<cache_dir>/<server host>/audio/<attachment id>.<ext>`.
/// Downloads are streamed into a `.part` sibling and renamed into place once
/// complete, so a half-written file is never reported as cached.
pub struct FileMediaStore {
    root: PathBuf,
    client: Client,
}

impl FileMediaStore {
    /// Create a store rooted at `cache_dir` for media from `server_host`.
    pub fn new(cache_dir: impl Into<PathBuf>, server_host: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .user_agent(concat!("chat-audio-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self::with_client(cache_dir, server_host, client))
    }

    /// Create a store with a preconfigured HTTP client
    pub fn with_client(cache_dir: impl Into<PathBuf>, server_host: &str, client: Client) -> Self {
        let root = cache_dir
            .into()
            .join(sanitize_component(server_host))
            .join(AUDIO_DIR);
        Self { root, client }
    }

    /// Platform cache directory for chat media (`<cache>/chat-audio`).
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("chat-audio")
    }

    /// Directory holding the cached audio files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, attachment_id: &str, mime_type: Option<&str>) -> PathBuf {
        self.root.join(format!(
            "{}.{}",
            sanitize_component(attachment_id),
            extension_for_mime(mime_type)
        ))
    }

    async fn fetch_into(&self, url: &str, partial: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Network(format!("HTTP error: {}", status)));
        }

        let mut file = fs::File::create(partial).await.map_err(filesystem_error)?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| BridgeError::Network(e.without_url().to_string()))?;
            file.write_all(&chunk).await.map_err(filesystem_error)?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(filesystem_error)?;
        Ok(written)
    }
}

#[async_trait]
impl MediaStore for FileMediaStore {
    async fn resolve(
        &self,
        attachment_id: &str,
        mime_type: Option<&str>,
    ) -> Result<CacheResolution> {
        let path = self.path_for(attachment_id, mime_type);
        let exists = fs::try_exists(&path).await.map_err(filesystem_error)?;
        let local_path = path.to_string_lossy().into_owned();

        debug!(attachment_id, exists, "Resolved cached media");

        Ok(if exists {
            CacheResolution::hit(local_path)
        } else {
            CacheResolution::miss(local_path)
        })
    }

    async fn download(&self, url: &str, destination: &str, auth: &AuthContext) -> Result<String> {
        let destination_path = Path::new(destination);
        if let Some(parent) = destination_path.parent() {
            fs::create_dir_all(parent).await.map_err(filesystem_error)?;
        }

        let partial = PathBuf::from(format!("{}{}", destination, PARTIAL_SUFFIX));
        let result = match self.fetch_into(&auth.authorize_url(url), &partial).await {
            Ok(bytes) => fs::rename(&partial, destination_path)
                .await
                .map(|_| bytes)
                .map_err(filesystem_error),
            Err(e) => Err(e),
        };

        match result {
            Ok(bytes) => {
                debug!(bytes, "Downloaded media");
                Ok(file_uri(destination))
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(error = %cleanup, "Failed to remove partial download");
                    }
                }
                Err(e)
            }
        }
    }
}

fn filesystem_error(e: std::io::Error) -> BridgeError {
    BridgeError::Filesystem(e.to_string())
}

/// File extension for an audio MIME type.
pub fn extension_for_mime(mime_type: Option<&str>) -> String {
    let Some(mime) = mime_type else {
        return "audio".to_string();
    };
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let ext = match essence.as_str() {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/x-m4a" | "audio/m4a" => "m4a",
        "audio/aac" => "aac",
        "audio/ogg" => "ogg",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/webm" => "webm",
        "audio/flac" | "audio/x-flac" => "flac",
        other => {
            let subtype = other
                .split_once('/')
                .map(|(_, subtype)| sanitize_component(subtype))
                .unwrap_or_default();
            return if subtype.is_empty() || subtype == "_" {
                "audio".to_string()
            } else {
                subtype
            };
        }
    };
    ext.to_string()
}

/// Make a string safe to use as a single path component.
fn sanitize_component(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}
