//! # Playback Error Types
//!
//! Errors raised by the attachment playback layer. None of them reach the
//! hosting view: the controller logs them and maps them onto a
//! [`Phase`](crate::state::Phase).

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur while resolving, downloading or playing an attachment.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The attachment carries no usable remote URL.
    #[error("Attachment has no remote URL: {0}")]
    MissingUrl(String),

    /// A host bridge (media store, policy, engine) failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if the user can retry the same action.
    ///
    /// Network and filesystem failures during download keep the
    /// "tap to download" affordance alive; a missing URL never recovers.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PlaybackError::Bridge(err) => {
                err.is_network() || err.is_filesystem() || err.is_engine()
            }
            PlaybackError::MissingUrl(_) | PlaybackError::Internal(_) => false,
        }
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(self, PlaybackError::Bridge(err) if err.is_network())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
