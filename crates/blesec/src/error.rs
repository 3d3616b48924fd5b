//! Error types for the blesec library
//!
//! This module defines the status codes returned synchronously by every
//! public entry point of the security manager, the private address
//! controller and the security database.

use thiserror::Error;

/// Errors returned by security and privacy operations
#[derive(Error, Debug)]
pub enum BleError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid state for operation")]
    InvalidState,

    #[error("Operation not implemented by the current configuration")]
    NotImplemented,

    #[error("No memory or space left")]
    NoMemory,

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt persisted data: {0}")]
    CorruptData(String),
}

/// Result type for security and privacy operations
pub type BleResult<T> = Result<T, BleError>;
