//! CLI error type.

use blocklog_core::LogError;
use blocklog_storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("no image path given (use --path)")]
    MissingPath,

    #[error("image {0} already exists (use --force to overwrite)")]
    ImageExists(PathBuf),

    #[error("log operation failed")]
    Log(#[from] LogError),

    #[error("image access failed")]
    Storage(#[from] StorageError),

    #[error("failed to encode JSON output")]
    Json(#[from] serde_json::Error),

    #[error("verification found {problems} problem(s)")]
    VerifyFailed { problems: usize },
}
