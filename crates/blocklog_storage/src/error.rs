//! Error types for block store operations.

use std::io;
use thiserror::Error;

/// Result type for block store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during block store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The block index is outside the store.
    #[error("block index {index} out of range (0..{count})")]
    BlockOutOfRange {
        /// The requested block index.
        index: u32,
        /// The number of blocks in the store.
        count: u32,
    },

    /// The data handed to a write is not exactly one block.
    #[error("block size mismatch: expected {expected} bytes, got {actual}")]
    BlockSizeMismatch {
        /// The store's block size.
        expected: usize,
        /// The length that was supplied.
        actual: usize,
    },

    /// The store geometry is unusable.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}
