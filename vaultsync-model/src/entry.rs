//! Entries: the credential records of the replica tree.
//!
//! An entry's history is a list of frozen snapshots of its earlier states,
//! oldest first. Snapshots are themselves `Entry` values that never carry
//! history of their own and never belong to a group.

use crate::group::Icon;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use vaultsync_types::{CompareOptions, NodeId, TimeInfo};

/// Standard attribute keys.
pub mod attr {
    pub const TITLE: &str = "Title";
    pub const USERNAME: &str = "UserName";
    pub const PASSWORD: &str = "Password";
    pub const URL: &str = "URL";
    pub const NOTES: &str = "Notes";
    /// Informational marker set on the older copy when both are kept.
    pub const MERGED: &str = "merged";
}

/// Flags for [`Entry::clone_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloneFlags {
    /// Carry the revision history over to the copy.
    pub include_history: bool,
    /// Give the copy (and its history) a freshly generated identifier.
    pub new_id: bool,
}

impl CloneFlags {
    pub const NONE: Self = Self {
        include_history: false,
        new_id: false,
    };

    pub const INCLUDE_HISTORY: Self = Self {
        include_history: true,
        new_id: false,
    };

    pub const NEW_ID_WITH_HISTORY: Self = Self {
        include_history: true,
        new_id: true,
    };
}

fn tracking_enabled() -> bool {
    true
}

/// An entry node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    id: NodeId,
    attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attachments: BTreeMap<String, Arc<[u8]>>,
    icon: Icon,
    #[serde(default)]
    pub(crate) group: Option<NodeId>,
    time_info: TimeInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) history: Vec<Entry>,
    #[serde(skip, default = "tracking_enabled")]
    pub(crate) update_time_info: bool,
}

impl Entry {
    /// Creates a detached, empty entry with a fresh identifier.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_id(NodeId::new(), now)
    }

    /// Creates a detached, empty entry with the given identifier.
    #[must_use]
    pub fn with_id(id: NodeId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            attributes: BTreeMap::new(),
            attachments: BTreeMap::new(),
            icon: Icon::default(),
            group: None,
            time_info: TimeInfo::new(now),
            history: Vec::new(),
            update_time_info: true,
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns an attribute value, empty when unset.
    #[must_use]
    pub fn attribute(&self, key: &str) -> &str {
        self.attributes.get(key).map(String::as_str).unwrap_or("")
    }

    #[must_use]
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.attribute(attr::TITLE)
    }

    #[must_use]
    pub fn username(&self) -> &str {
        self.attribute(attr::USERNAME)
    }

    #[must_use]
    pub fn password(&self) -> &str {
        self.attribute(attr::PASSWORD)
    }

    #[must_use]
    pub fn url(&self) -> &str {
        self.attribute(attr::URL)
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        self.attribute(attr::NOTES)
    }

    /// Attachment payloads. Clones share the underlying bytes.
    #[must_use]
    pub fn attachments(&self) -> &BTreeMap<String, Arc<[u8]>> {
        &self.attachments
    }

    #[must_use]
    pub fn icon(&self) -> Icon {
        self.icon
    }

    /// Owning group; `None` for detached entries and history snapshots.
    #[must_use]
    pub fn group(&self) -> Option<NodeId> {
        self.group
    }

    #[must_use]
    pub fn time_info(&self) -> &TimeInfo {
        &self.time_info
    }

    /// Snapshots of earlier states, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Entry] {
        &self.history
    }

    #[must_use]
    pub fn can_update_time_info(&self) -> bool {
        self.update_time_info
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        self.attributes.remove(key)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.set_attribute(attr::TITLE, title);
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.set_attribute(attr::USERNAME, username);
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.set_attribute(attr::PASSWORD, password);
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.set_attribute(attr::URL, url);
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.set_attribute(attr::NOTES, notes);
    }

    pub fn set_attachment(&mut self, name: impl Into<String>, data: Arc<[u8]>) {
        self.attachments.insert(name.into(), data);
    }

    pub fn set_icon(&mut self, icon: Icon) {
        self.icon = icon;
    }

    pub fn set_time_info(&mut self, time_info: TimeInfo) {
        self.time_info = time_info;
    }

    pub(crate) fn time_info_mut(&mut self) -> &mut TimeInfo {
        &mut self.time_info
    }

    /// Deep copy, detached from any group.
    ///
    /// With `new_id` the copy and every history snapshot get one freshly
    /// generated identifier; otherwise the original identifier is kept.
    #[must_use]
    pub fn clone_with(&self, flags: CloneFlags) -> Self {
        let id = if flags.new_id { NodeId::new() } else { self.id };
        let history = if flags.include_history {
            self.history.iter().map(|item| item.snapshot_as(id)).collect()
        } else {
            Vec::new()
        };
        Self {
            id,
            group: None,
            history,
            update_time_info: true,
            ..self.clone()
        }
    }

    /// A history snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        Self {
            group: None,
            history: Vec::new(),
            update_time_info: true,
            ..self.clone()
        }
    }

    /// A history snapshot of the current state, re-keyed to `id`.
    pub(crate) fn snapshot_as(&self, id: NodeId) -> Self {
        Self {
            id,
            ..self.snapshot()
        }
    }

    /// True when the user-visible content (attributes, attachments, icon)
    /// matches, whatever the time stamps say.
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes
            && self.attachments == other.attachments
            && self.icon == other.icon
    }

    /// Compares two entries under the given options.
    #[must_use]
    pub fn equals(&self, other: &Self, options: CompareOptions) -> bool {
        if self.id != other.id || !self.content_eq(other) {
            return false;
        }
        if !self.time_info.equals(&other.time_info, options) {
            return false;
        }
        if !options.ignore_location && self.group != other.group {
            return false;
        }
        if options.ignore_history {
            return true;
        }
        self.history.len() == other.history.len()
            && self
                .history
                .iter()
                .zip(&other.history)
                .all(|(a, b)| a.equals(b, options))
    }
}
