//! The audit trail produced by a merge.

use serde::Serialize;
use std::fmt;
use vaultsync_types::NodeId;

/// One change applied to the target replica.
///
/// `Display` renders the human-readable line shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change {
    /// A node only the source had was copied over.
    Created { name: String, id: NodeId },
    /// A node was moved to follow the source's newer placement.
    Relocated { name: String, id: NodeId },
    /// The target's node was replaced by the newer source version.
    Overwritten { name: String, id: NodeId },
    /// The source entry was older; it was kept as a marked copy.
    BackupForOlderSource { name: String, id: NodeId },
    /// The target entry was older; it was marked and the source added.
    BackupForOlderTarget { name: String, id: NodeId },
    /// The source entry was newer and took over, histories combined.
    SynchronizedFromNewerSource { name: String, id: NodeId },
    /// The target entry stayed on top; older source history was folded in.
    SynchronizedFromOlderSource { name: String, id: NodeId },
    /// A tombstoned node was erased from the target.
    Deleted { name: String, id: NodeId },
    /// The target's tombstone ledger differs from before the merge.
    DeletedObjectsChanged,
    /// A custom icon missing from the target was copied.
    IconAdded { id: NodeId },
}

impl Change {
    /// The node this change concerns, if any.
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Created { id, .. }
            | Self::Relocated { id, .. }
            | Self::Overwritten { id, .. }
            | Self::BackupForOlderSource { id, .. }
            | Self::BackupForOlderTarget { id, .. }
            | Self::SynchronizedFromNewerSource { id, .. }
            | Self::SynchronizedFromOlderSource { id, .. }
            | Self::Deleted { id, .. }
            | Self::IconAdded { id } => Some(*id),
            Self::DeletedObjectsChanged => None,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { name, id } => {
                write!(f, "Creating missing {name} [{}]", id.to_hex())
            }
            Self::Relocated { name, id } => write!(f, "Relocating {name} [{}]", id.to_hex()),
            Self::Overwritten { name, id } => write!(f, "Overwriting {name} [{}]", id.to_hex()),
            Self::BackupForOlderSource { name, id } => {
                write!(f, "Adding backup for older source {name} [{}]", id.to_hex())
            }
            Self::BackupForOlderTarget { name, id } => {
                write!(f, "Adding backup for older target {name} [{}]", id.to_hex())
            }
            Self::SynchronizedFromNewerSource { name, id } => {
                write!(f, "Synchronizing from newer source {name} [{}]", id.to_hex())
            }
            Self::SynchronizedFromOlderSource { name, id } => {
                write!(f, "Synchronizing from older source {name} [{}]", id.to_hex())
            }
            Self::Deleted { name, id } => write!(f, "Deleting child {name} [{}]", id.to_hex()),
            Self::DeletedObjectsChanged => f.write_str("Changed deleted objects"),
            Self::IconAdded { id } => write!(f, "Adding missing icon {}", id.to_hex()),
        }
    }
}
