//! Error types for the sync engine.

use merx_client::ApiFault;
use thiserror::Error;

/// Result type for sync-engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while reconciling a draft.
///
/// These are reported per draft through the error callback and folded
/// into the run statistics; a single failing draft never aborts a run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The draft failed batch validation.
    #[error("{0}")]
    Validation(String),

    /// A reference could not be resolved to a platform id.
    #[error("{0}")]
    ReferenceResolution(String),

    /// The platform API rejected or failed an operation.
    #[error(transparent)]
    Api(#[from] ApiFault),

    /// An update could not complete after a version conflict. The message
    /// names the recovery step that failed.
    #[error("{0}")]
    ConflictRecovery(String),

    /// A waiting-room store operation failed. Non-fatal: the run
    /// continues, the affected draft just loses its parking spot.
    #[error("{0}")]
    Store(String),

    /// A waiting-room record failed to serialize or deserialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
