//! Progress tracking errors.

use fittrack_storage::StorageError;

/// Result type for progress operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors that can occur while computing weekly progress.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// A store query failed; no partial or zeroed result is returned.
    #[error("record store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),
}
