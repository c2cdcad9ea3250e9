//! Error types for Linux I2C operations

use thiserror::Error;

/// Linux I2C specific errors
#[derive(Debug, Error)]
pub enum LinuxI2cError {
    /// Failed to open the adapter device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to query adapter functionality
    #[error("Failed to query functionality of {path}: {source}")]
    FuncsFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Adapter cannot do plain I2C transfers
    #[error("{0} does not support combined I2C transfers")]
    NotSupported(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for Linux I2C operations
pub type Result<T> = std::result::Result<T, LinuxI2cError>;
