//! Error types for sparse matrix encode/decode operations.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("allocation failure: {0}")]
    Allocation(String),

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(String),

    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    #[error("unsupported value type: {0}")]
    UnsupportedValueType(String),
}

pub type Result<T> = std::result::Result<T, MatrixError>;
