//! Error types for Tidelog

use thiserror::Error;

/// Result type alias for log operations
pub type Result<T> = std::result::Result<T, LogError>;

/// Tidelog error types
#[derive(Error, Debug)]
pub enum LogError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested offset is below the oldest or above the newest record
    #[error("offset {offset} is outside the range of the log")]
    OffsetOutOfRange { offset: u64 },

    /// The index holds no entry for the requested relative offset
    #[error("no index entry at the requested offset")]
    EndOfIndex,

    /// The index mapping cannot hold another entry
    #[error("index mapping is full")]
    IndexFull,

    /// Record framing or decoding failed
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The log has been closed; reopen it to continue
    #[error("log is closed")]
    Closed,
}

impl LogError {
    /// Check if the operation may succeed when retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, LogError::Io(_))
    }

    /// Check if the error carries an out-of-range offset
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, LogError::OffsetOutOfRange { .. })
    }
}
