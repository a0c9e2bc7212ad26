//! Error types for the log engine.

use thiserror::Error;

/// Result type for log operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur in log operations.
#[derive(Debug, Error)]
pub enum LogError {
    /// Block sequences are inconsistent at open, or a message's parts do not
    /// line up at read. The affected message is lost.
    #[error("data corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Every committed and staged message has been read.
    #[error("nothing more to read")]
    ReadAll,

    /// The caller's buffer cannot hold the next message. No cursor moved.
    #[error("message of {needed} bytes does not fit in buffer of {available} bytes")]
    BufferTooSmall {
        /// Size of the next message.
        needed: usize,
        /// Size of the caller's buffer.
        available: usize,
    },

    /// Every block of the ring holds unread data.
    #[error("no space left: every block holds unread data")]
    NoSpaceLeftInBuffer,

    /// The block store failed.
    #[error("storage error: {0}")]
    Storage(#[from] blocklog_storage::StorageError),

    /// An argument was rejected before any state changed.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the argument problem.
        message: String,
    },

    /// The configuration cannot drive a log.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration problem.
        message: String,
    },

    /// Close was called with data still in the staging block.
    #[error("{staged} staged bytes not yet synced")]
    UnsyncedData {
        /// Bytes waiting in the staging block.
        staged: usize,
    },
}

impl LogError {
    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns the numeric code used by the C API of deployed devices.
    ///
    /// Generic failures share `-1` with corruption.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::ReadAll => -2,
            Self::BufferTooSmall { .. } => -3,
            Self::NoSpaceLeftInBuffer => -4,
            Self::Corrupted { .. }
            | Self::Storage(_)
            | Self::InvalidArgument { .. }
            | Self::InvalidConfig { .. }
            | Self::UnsyncedData { .. } => -1,
        }
    }

    /// Returns `true` for outcomes a caller is expected to poll through.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ReadAll | Self::BufferTooSmall { .. } | Self::NoSpaceLeftInBuffer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklog_storage::StorageError;
    use std::error::Error as _;

    #[test]
    fn codes_match_device_api() {
        assert_eq!(LogError::corrupted("x").code(), -1);
        assert_eq!(LogError::ReadAll.code(), -2);
        assert_eq!(
            LogError::BufferTooSmall {
                needed: 10,
                available: 4
            }
            .code(),
            -3
        );
        assert_eq!(LogError::NoSpaceLeftInBuffer.code(), -4);
    }

    #[test]
    fn storage_error_keeps_source() {
        let err = LogError::from(StorageError::BlockOutOfRange { index: 9, count: 4 });
        assert!(err.source().is_some());
        assert!(err.to_string().contains("out of range"));
        assert!(!err.is_transient());
    }

    #[test]
    fn read_all_is_transient() {
        assert!(LogError::ReadAll.is_transient());
        assert!(!LogError::corrupted("bad").is_transient());
    }
}
