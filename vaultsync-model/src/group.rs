//! Groups: the folders of the replica tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vaultsync_types::{NodeId, Precision, TimeInfo};

/// Policy for resolving an entry that exists on both replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Never touch the target entry.
    KeepExisting,
    /// Replace the target with the source when the source is newer.
    KeepNewer,
    /// Keep both versions, marking the older one.
    KeepBoth,
    /// Reconcile revision histories, newest state on top.
    Synchronize,
}

impl MergeMode {
    /// The policy used when nothing is configured anywhere.
    pub const DEFAULT: Self = Self::KeepNewer;
}

/// Icon of a group or entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Icon {
    /// One of the built-in icons, by number.
    Builtin(u32),
    /// A custom icon from the metadata icon store.
    Custom(NodeId),
}

impl Default for Icon {
    fn default() -> Self {
        Self::Builtin(0)
    }
}

fn tracking_enabled() -> bool {
    true
}

/// A group node.
///
/// Child groups and entries are held by identifier; the owning
/// [`Database`](crate::Database) arena resolves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    id: NodeId,
    name: String,
    notes: String,
    icon: Icon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    merge_mode: Option<MergeMode>,
    time_info: TimeInfo,
    #[serde(default)]
    pub(crate) parent: Option<NodeId>,
    #[serde(default)]
    pub(crate) children: Vec<NodeId>,
    #[serde(default)]
    pub(crate) entries: Vec<NodeId>,
    #[serde(skip, default = "tracking_enabled")]
    pub(crate) update_time_info: bool,
}

/// The user-editable properties of a group, for change detection.
#[derive(PartialEq)]
pub(crate) struct GroupProps {
    name: String,
    notes: String,
    icon: Icon,
    merge_mode: Option<MergeMode>,
    expires: bool,
    expiry_time: DateTime<Utc>,
}

impl Group {
    /// Creates a detached group with a fresh identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::with_id(NodeId::new(), name, now)
    }

    /// Creates a detached group with the given identifier.
    #[must_use]
    pub fn with_id(id: NodeId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            notes: String::new(),
            icon: Icon::default(),
            merge_mode: None,
            time_info: TimeInfo::new(now),
            parent: None,
            children: Vec::new(),
            entries: Vec::new(),
            update_time_info: true,
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    #[must_use]
    pub fn icon(&self) -> Icon {
        self.icon
    }

    /// The policy configured on this group itself, if any.
    #[must_use]
    pub fn merge_mode(&self) -> Option<MergeMode> {
        self.merge_mode
    }

    #[must_use]
    pub fn time_info(&self) -> &TimeInfo {
        &self.time_info
    }

    /// Parent group, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child group ids in display order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Entry ids in display order.
    #[must_use]
    pub fn entries(&self) -> &[NodeId] {
        &self.entries
    }

    #[must_use]
    pub fn can_update_time_info(&self) -> bool {
        self.update_time_info
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub fn set_icon(&mut self, icon: Icon) {
        self.icon = icon;
    }

    pub fn set_merge_mode(&mut self, mode: Option<MergeMode>) {
        self.merge_mode = mode;
    }

    pub fn set_expiry_time(&mut self, time: DateTime<Utc>) {
        self.time_info.set_expiry_time(time);
    }

    pub fn set_expires(&mut self, expires: bool) {
        self.time_info.set_expires(expires);
    }

    pub fn set_time_info(&mut self, time_info: TimeInfo) {
        self.time_info = time_info;
    }

    pub(crate) fn time_info_mut(&mut self) -> &mut TimeInfo {
        &mut self.time_info
    }

    /// Copies this group's own data without its place in any tree: no
    /// parent, no children, no entries.
    #[must_use]
    pub fn clone_node(&self) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            entries: Vec::new(),
            update_time_info: true,
            ..self.clone()
        }
    }

    pub(crate) fn props(&self) -> GroupProps {
        GroupProps {
            name: self.name.clone(),
            notes: self.notes.clone(),
            icon: self.icon,
            merge_mode: self.merge_mode,
            expires: self.time_info.expires(),
            expiry_time: self.time_info.expiry_time(Precision::High),
        }
    }
}
