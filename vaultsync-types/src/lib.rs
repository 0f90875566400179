//! Core type definitions for vaultsync.
//!
//! This crate defines the fundamental types shared by the replica model and
//! the merge engine:
//! - Node identifiers (UUID v7), stable across replicas
//! - Per-node time stamps with full and serialized (whole second) precision
//! - Comparison options used for semantic equality checks
//! - The clock abstraction every replica draws its timestamps from

mod clock;
mod compare;
mod ids;
mod time_info;

pub use clock::{Clock, ManualClock, SystemClock};
pub use compare::CompareOptions;
pub use ids::NodeId;
pub use time_info::{Precision, TimeInfo, serialized};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
