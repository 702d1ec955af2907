use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Remote fetch failed (connection, timeout, non-success status).
    #[error("Network error: {0}")]
    Network(String),

    /// Local storage failed (missing directory, write error, rename error).
    #[error("Filesystem error: {0}")]
    Filesystem(String),

    /// The platform audio engine rejected a load/play/pause/seek/stop call.
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn is_network(&self) -> bool {
        matches!(self, BridgeError::Network(_))
    }

    /// Plain `Io` errors come from local storage and count as filesystem failures.
    pub fn is_filesystem(&self) -> bool {
        matches!(self, BridgeError::Filesystem(_) | BridgeError::Io(_))
    }

    pub fn is_engine(&self) -> bool {
        matches!(self, BridgeError::Engine(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
