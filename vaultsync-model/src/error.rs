//! Error types for the replica model.

use thiserror::Error;
use vaultsync_types::NodeId;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Structural errors raised by replica mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// No live entry with this identifier.
    #[error("entry not found: {0}")]
    EntryNotFound(NodeId),

    /// No live group with this identifier.
    #[error("group not found: {0}")]
    GroupNotFound(NodeId),

    /// The identifier is already taken by a live node.
    #[error("duplicate node id: {0}")]
    DuplicateId(NodeId),

    /// The move would place a group beneath itself.
    #[error("moving group {group} under {parent} would create a cycle")]
    Cycle { group: NodeId, parent: NodeId },

    /// The root group cannot be moved, replaced or removed.
    #[error("the root group cannot be moved or removed")]
    RootImmutable,

    /// A replacement carried a different identifier than the node it replaces.
    #[error("replacement for {expected} carries id {found}")]
    IdMismatch { expected: NodeId, found: NodeId },

    /// Loaded data violates a tree invariant.
    #[error("inconsistent replica: {0}")]
    Inconsistent(String),
}
