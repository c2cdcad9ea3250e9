//! Error types for boardid-core

use thiserror::Error;

use crate::bus::BusError;
use crate::source::ValidationError;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// A bus transfer failed while operating on a slot
    #[error("slot '{slot}': {source}")]
    Transport {
        /// Name of the slot being accessed
        slot: String,
        /// Underlying bus error
        #[source]
        source: BusError,
    },

    /// Board type code has no entry (or no models) in the board type table
    #[error("unknown board type {0}")]
    UnknownBoardType(u8),

    /// Model index is outside the model list for the board type
    #[error("board type {board_type} has no model with index {board_id}")]
    UnknownModel {
        /// Board type code
        board_type: u8,
        /// Model index
        board_id: u8,
    },

    /// A text field does not fit in a 16-byte record field
    #[error("field '{field}' is {len} bytes long (maximum {max})")]
    FieldTooLong {
        /// Field name
        field: &'static str,
        /// Actual length
        len: usize,
        /// Maximum length
        max: usize,
    },

    /// A text field contains non-ASCII characters
    #[error("field '{0}' must be plain ASCII")]
    FieldNotAscii(&'static str),

    /// Operator input failed validation
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The value source ran out of input
    #[error("input closed before all values were collected")]
    InputClosed,

    /// Configuration file could not be parsed
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration or topology is inconsistent
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Board type table could not be parsed
    #[error("board type table parse error: {0}")]
    TableParse(#[from] serde_json::Error),

    /// Board type table content is inconsistent
    #[error("invalid board type table: {0}")]
    Table(String),

    /// I/O error reading a file or talking to the operator
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a bus error with the name of the slot it happened on
    pub fn transport(slot: &str, source: BusError) -> Self {
        Self::Transport {
            slot: slot.to_string(),
            source,
        }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;
