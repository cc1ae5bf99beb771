// src/error.rs

use crate::common::{Format, Hash};
use thiserror::Error;

/// Error type for the sequence layer.
#[derive(Error, Debug)]
pub enum SequenceError {
    #[error("invalid ordered key: {0}")]
    InvalidKey(String),

    #[error("invalid meta tuple: {0}")]
    InvalidTuple(String),

    #[error("structural violation: {0}")]
    StructuralViolation(String),

    #[error("format mismatch: node is {expected:?}, child is {actual:?}")]
    FormatMismatch { expected: Format, actual: Format },

    #[error("operation cancelled")]
    Cancelled,

    #[error("chunk not found in store for hash: {0:02x?}")]
    ChunkNotFound(Hash),

    #[error("storage operation failed: {0}")]
    StorageError(String),
}

/// Result type alias for sequence operations.
pub type Result<T> = std::result::Result<T, SequenceError>;
