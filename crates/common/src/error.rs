use thiserror::Error;

/// Classification of a Transport Adapter read failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request itself timed out (message contains "timeout", case-insensitively).
    Timeout,
    /// Any other connection/IO failure.
    Offline,
}

impl TransportErrorKind {
    /// Classify a raw error message the way the Transport Adapter does.
    pub fn classify(message: &str) -> Self {
        if message.to_lowercase().contains("timeout") {
            TransportErrorKind::Timeout
        } else {
            TransportErrorKind::Offline
        }
    }
}

/// Top-level error type for DWP poller operations.
#[derive(Debug, Error)]
pub enum DwpError {
    #[error("Modbus transport error ({kind:?}): {detail}")]
    Transport {
        kind: TransportErrorKind,
        detail: String,
    },

    #[error("Device catalog error: {0}")]
    Catalog(String),

    #[error("Relational sink error: {0}")]
    Sink(String),

    #[error("Waveform validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for DWP poller operations.
pub type Result<T> = std::result::Result<T, DwpError>;
