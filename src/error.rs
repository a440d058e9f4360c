//! Error types for mcwire
//!
//! Provides a unified error type for all operations, and the classifier that
//! decides whether a session may continue after an error.

use thiserror::Error;

/// Result type alias using WireError
pub type Result<T> = std::result::Result<T, WireError>;

/// Unified error type for mcwire operations
#[derive(Debug, Error)]
pub enum WireError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Read deadline exceeded")]
    Timeout,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// The command line could not be understood; answered with `ERROR`.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The byte stream can no longer be trusted (short item read, missing
    /// terminator, oversized line or item).
    #[error("Framing error: {0}")]
    Framing(String),

    // -------------------------------------------------------------------------
    // Cache Errors
    // -------------------------------------------------------------------------
    #[error("Cache miss")]
    CacheMiss,

    #[error("Compare-and-swap conflict")]
    CasConflict,

    #[error("Item not stored")]
    NotStored,

    #[error("Malformed key: key is too long or contains invalid characters")]
    MalformedKey,

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WireError {
    /// Returns true if the error is only a protocol-level cache condition.
    ///
    /// A resumable error leaves the connection usable. Anything else means the
    /// byte stream itself is no longer trustworthy and the connection is closed.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            WireError::CacheMiss
                | WireError::CasConflict
                | WireError::NotStored
                | WireError::MalformedKey
                | WireError::Protocol(_)
        )
    }

    /// Map an I/O error from a socket read or write into the session taxonomy.
    ///
    /// Socket timeouts surface as `WouldBlock` on unix and `TimedOut` on
    /// windows, and an expired session deadline as `TimedOut`; all become
    /// `Timeout`.
    pub fn from_stream(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => WireError::Timeout,
            _ => WireError::Io(err),
        }
    }
}
