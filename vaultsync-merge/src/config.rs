//! Merge configuration.

use serde::{Deserialize, Serialize};
use vaultsync_model::MergeMode;

/// Settings applied to a [`Merger`](crate::Merger).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// Policy applied to every group, overriding per-group settings.
    /// `None` leaves each group's own (or inherited) policy in force.
    pub forced_mode: Option<MergeMode>,
}

impl MergeConfig {
    /// Forces one policy for the whole merge.
    #[must_use]
    pub fn forced(mode: MergeMode) -> Self {
        Self {
            forced_mode: Some(mode),
        }
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
