//! Error types for bitmap operations.

use std::io;

use thiserror::Error;

/// Error variants for bitmap operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A range was empty or wrapped around the unsigned 64-bit space.
    #[error("invalid range [{start}, {end})")]
    InvalidRange {
        /// Inclusive start of the rejected range.
        start: u64,
        /// Exclusive end of the rejected range.
        end: u64,
    },

    /// A selection was requested for an index past the cardinality.
    #[error("select index {index} out of bounds for cardinality {cardinality}")]
    SelectOutOfBounds {
        /// The requested 0-based index.
        index: u64,
        /// The cardinality at the time of the call.
        cardinality: u64,
    },

    /// The operation requires a non-empty bitmap.
    #[error("bitmap is empty")]
    Empty,

    /// An I/O error occurred during serialization or deserialization.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Serialized input failed structural validation.
    #[error("malformed serialized bitmap: {0}")]
    Format(&'static str),
}

/// A specialized Result type for bitmap operations.
pub type Result<T> = std::result::Result<T, Error>;
