//! Error types for atomtile.

use thiserror::Error;

/// Main error type for all atomtile operations.
#[derive(Debug, Error)]
pub enum AtomtileError {
    /// I/O error on the serial transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port open/configure error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Reply payload rejected before encoding (non-ASCII or too long).
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// JSON error while reading the weather cache file.
    #[error("weather file error: {0}")]
    Weather(#[from] serde_json::Error),

    /// The panel side of the transport went away (EOF on read).
    #[error("transport closed")]
    TransportClosed,
}

/// Result type alias using AtomtileError.
pub type Result<T> = std::result::Result<T, AtomtileError>;
