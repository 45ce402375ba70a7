//! Error types shared across the engine

/// Errors raised by the capture layer
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaptureError {
    /// The speech capability is missing or permission was denied.
    /// Reported once; the engine goes Idle and stops auto-restarting.
    #[error("speech capture unavailable: {0}")]
    Unavailable(String),

    /// A session failed mid-capture. The engine resets to Idle and the
    /// user must re-issue the voice command.
    #[error("transient capture error: {0}")]
    Transient(String),
}

/// Errors raised by the persistence layer
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
