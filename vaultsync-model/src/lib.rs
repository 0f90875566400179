//! Replica model for vaultsync.
//!
//! A replica is a single-rooted tree of groups and entries plus a tombstone
//! ledger and shared metadata:
//!
//! - [`Database`]: arena of nodes keyed by [`NodeId`](vaultsync_types::NodeId)
//! - [`Group`]: folder with an optional [`MergeMode`] policy
//! - [`Entry`]: credential record with a bounded revision history
//! - [`TombstoneLedger`]: deletions to propagate to other replicas
//! - [`UpdateSuspension`]: scoped guard that pauses timestamp tracking
//!
//! Every mutation goes through [`Database`], which keeps the parent/child
//! links consistent and stamps times from the replica's clock.

mod database;
mod entry;
mod error;
mod group;
mod metadata;
mod suspend;
mod tombstone;

pub use database::{Database, merged_marker};
pub use entry::{CloneFlags, Entry, attr};
pub use error::{ModelError, ModelResult};
pub use group::{Group, Icon, MergeMode};
pub use metadata::{DEFAULT_HISTORY_MAX_ITEMS, Metadata};
pub use suspend::{NodeRef, UpdateSuspension};
pub use tombstone::{DeletedObject, TombstoneLedger};
