//! Error types for the merge engine.

use thiserror::Error;
use vaultsync_model::ModelError;
use vaultsync_types::NodeId;

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors that can occur while setting up or running a merge.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// A group named as a merge root does not exist in its replica.
    #[error("merge group not found: {0}")]
    GroupNotFound(NodeId),

    /// The target replica rejected a structural change.
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}
