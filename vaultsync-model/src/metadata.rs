//! Replica-wide settings and shared resources.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vaultsync_types::NodeId;

/// History snapshots kept per entry unless configured otherwise.
pub const DEFAULT_HISTORY_MAX_ITEMS: usize = 10;

/// Shared metadata of a replica.
///
/// Custom icons are owned here rather than by any group or entry; nodes
/// refer to them through [`Icon::Custom`](crate::Icon::Custom).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Display name, quoted in the marker left on entries kept as backups.
    pub name: String,
    /// Maximum history snapshots retained per entry; oldest go first.
    pub history_max_items: usize,
    /// Custom icon store: identifier to encoded image bytes.
    #[serde(default)]
    pub custom_icons: BTreeMap<NodeId, Vec<u8>>,
    #[serde(default)]
    pub recycle_bin_enabled: bool,
    #[serde(default)]
    pub recycle_bin: Option<NodeId>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            history_max_items: DEFAULT_HISTORY_MAX_ITEMS,
            custom_icons: BTreeMap::new(),
            recycle_bin_enabled: true,
            recycle_bin: None,
        }
    }
}

impl Metadata {
    #[must_use]
    pub fn contains_custom_icon(&self, id: NodeId) -> bool {
        self.custom_icons.contains_key(&id)
    }

    pub fn add_custom_icon(&mut self, id: NodeId, image: Vec<u8>) {
        self.custom_icons.insert(id, image);
    }

    #[must_use]
    pub fn custom_icon(&self, id: NodeId) -> Option<&[u8]> {
        self.custom_icons.get(&id).map(Vec::as_slice)
    }
}
