//! The replica: an arena of groups and entries keyed by identifier.
//!
//! Nodes never own each other. A group lists its children and entries by
//! id, and every node records its parent, so removing a node is a map
//! removal plus index cleanup.
//!
//! Mutations refresh time stamps automatically unless tracking is disabled
//! on the affected node (see [`Database::suspend_time_updates`]):
//! - editing an entry or group bumps its last-modification time
//! - relocating a node bumps its location-changed time
//! - adding or removing a member bumps the containing group

use crate::entry::{Entry, attr};
use crate::error::{ModelError, ModelResult};
use crate::group::{Group, MergeMode};
use crate::metadata::Metadata;
use crate::suspend::{NodeRef, UpdateSuspension};
use crate::tombstone::TombstoneLedger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use vaultsync_types::{Clock, NodeId, SystemClock};

fn default_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

/// One replica of the secrets database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    root: NodeId,
    groups: BTreeMap<NodeId, Group>,
    entries: BTreeMap<NodeId, Entry>,
    #[serde(default)]
    deleted_objects: TombstoneLedger,
    #[serde(default)]
    metadata: Metadata,
    #[serde(skip)]
    modified: bool,
    #[serde(skip, default = "default_clock")]
    clock: Arc<dyn Clock>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// Creates an empty replica on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(default_clock())
    }

    /// Creates an empty replica whose time stamps come from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let root = Group::new("Root", clock.now());
        let root_id = root.id();
        let mut groups = BTreeMap::new();
        groups.insert(root_id, root);
        Self {
            root: root_id,
            groups,
            entries: BTreeMap::new(),
            deleted_objects: TombstoneLedger::new(),
            metadata: Metadata::default(),
            modified: false,
            clock,
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Swaps the time source, e.g. after deserializing.
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Lookup ───────────────────────────────────────────────────

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The root group; `None` only for an unvalidated replica whose root
    /// id dangles.
    #[must_use]
    pub fn root_group(&self) -> Option<&Group> {
        self.groups.get(&self.root)
    }

    #[must_use]
    pub fn group(&self, id: NodeId) -> Option<&Group> {
        self.groups.get(&id)
    }

    #[must_use]
    pub fn entry(&self, id: NodeId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    /// All live groups, root included, in identifier order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// All live entries in identifier order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Entries directly inside `group`, in display order.
    pub fn entries_of(&self, group: NodeId) -> impl Iterator<Item = &Entry> {
        self.groups
            .get(&group)
            .map(|g| g.entries.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.entries.get(id))
    }

    /// Child groups directly inside `group`, in display order.
    pub fn children_of(&self, group: NodeId) -> impl Iterator<Item = &Group> {
        self.groups
            .get(&group)
            .map(|g| g.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.groups.get(id))
    }

    /// Every entry below `group`, depth first, own entries before children's.
    #[must_use]
    pub fn entries_recursive(&self, group: NodeId) -> Vec<&Entry> {
        let mut out = Vec::new();
        self.collect_entries(group, &mut out);
        out
    }

    fn collect_entries<'a>(&'a self, group: NodeId, out: &mut Vec<&'a Entry>) {
        out.extend(self.entries_of(group));
        if let Some(g) = self.groups.get(&group) {
            for &child in &g.children {
                self.collect_entries(child, out);
            }
        }
    }

    /// Every group below `group` (excluding itself), depth first.
    #[must_use]
    pub fn groups_recursive(&self, group: NodeId) -> Vec<&Group> {
        let mut out = Vec::new();
        self.collect_groups(group, &mut out);
        out
    }

    fn collect_groups<'a>(&'a self, group: NodeId, out: &mut Vec<&'a Group>) {
        if let Some(g) = self.groups.get(&group) {
            for &child in &g.children {
                if let Some(c) = self.groups.get(&child) {
                    out.push(c);
                    self.collect_groups(child, out);
                }
            }
        }
    }

    /// First entry in tree order with the given title.
    #[must_use]
    pub fn find_entry_by_title(&self, title: &str) -> Option<&Entry> {
        self.entries_recursive(self.root)
            .into_iter()
            .find(|e| e.title() == title)
    }

    /// First group in tree order with the given name, root included.
    #[must_use]
    pub fn find_group_by_name(&self, name: &str) -> Option<&Group> {
        if let Some(root) = self.root_group().filter(|g| g.name() == name) {
            return Some(root);
        }
        self.groups_recursive(self.root)
            .into_iter()
            .find(|g| g.name() == name)
    }

    /// True when `ancestor` is a strict ancestor of `group`.
    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: NodeId, group: NodeId) -> bool {
        let mut current = self.groups.get(&group).and_then(Group::parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.groups.get(&id).and_then(Group::parent);
        }
        false
    }

    /// The merge policy in force for `group`: its own setting, else the
    /// nearest configured ancestor's, else [`MergeMode::DEFAULT`].
    #[must_use]
    pub fn effective_merge_mode(&self, group: NodeId) -> MergeMode {
        let mut current = self.groups.get(&group);
        while let Some(g) = current {
            if let Some(mode) = g.merge_mode() {
                return mode;
            }
            current = g.parent().and_then(|p| self.groups.get(&p));
        }
        MergeMode::DEFAULT
    }

    // ── Metadata and tombstones ──────────────────────────────────

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    #[must_use]
    pub fn deleted_objects(&self) -> &TombstoneLedger {
        &self.deleted_objects
    }

    pub fn set_deleted_objects(&mut self, ledger: TombstoneLedger) {
        self.deleted_objects = ledger;
    }

    #[must_use]
    pub fn contains_deleted_object(&self, id: NodeId) -> bool {
        self.deleted_objects.contains(id)
    }

    /// True once something flagged the replica as needing a save.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_as_modified(&mut self) {
        self.modified = true;
    }

    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    // ── Timestamp tracking ───────────────────────────────────────

    /// Disables automatic time stamp updates on `nodes` until the returned
    /// guard is dropped.
    pub fn suspend_time_updates(&mut self, nodes: &[NodeRef]) -> UpdateSuspension<'_> {
        UpdateSuspension::new(self, nodes)
    }

    /// Whether `node` currently refreshes its own time stamps.
    #[must_use]
    pub fn time_tracking(&self, node: NodeRef) -> Option<bool> {
        match node {
            NodeRef::Entry(id) => self.entries.get(&id).map(|e| e.update_time_info),
            NodeRef::Group(id) => self.groups.get(&id).map(|g| g.update_time_info),
        }
    }

    /// Sets tracking on `node`, returning the previous setting.
    pub(crate) fn set_time_tracking(&mut self, node: NodeRef, enabled: bool) -> Option<bool> {
        let flag = match node {
            NodeRef::Entry(id) => &mut self.entries.get_mut(&id)?.update_time_info,
            NodeRef::Group(id) => &mut self.groups.get_mut(&id)?.update_time_info,
        };
        Some(std::mem::replace(flag, enabled))
    }

    fn touch_group(&mut self, id: Option<NodeId>, now: DateTime<Utc>) {
        if let Some(group) = id.and_then(|id| self.groups.get_mut(&id)) {
            if group.update_time_info {
                group.time_info_mut().set_last_modification_time(now);
                group.time_info_mut().set_last_access_time(now);
            }
        }
    }

    fn ensure_unused(&self, id: NodeId) -> ModelResult<()> {
        if self.entries.contains_key(&id) || self.groups.contains_key(&id) {
            return Err(ModelError::DuplicateId(id));
        }
        Ok(())
    }

    // ── Structure ────────────────────────────────────────────────

    /// Attaches `entry` at the end of `group`.
    ///
    /// The entry's own time stamps are kept as given.
    pub fn add_entry(&mut self, group: NodeId, mut entry: Entry) -> ModelResult<NodeId> {
        let id = entry.id();
        self.ensure_unused(id)?;
        let now = self.clock.now();
        let target = self
            .groups
            .get_mut(&group)
            .ok_or(ModelError::GroupNotFound(group))?;
        target.entries.push(id);
        entry.group = Some(group);
        self.entries.insert(id, entry);
        self.touch_group(Some(group), now);
        Ok(id)
    }

    /// Attaches `group` as the last child of `parent`.
    ///
    /// Only the node itself is inserted; any child or entry ids it carried
    /// are dropped. Its own time stamps are kept as given.
    pub fn add_group(&mut self, parent: NodeId, mut group: Group) -> ModelResult<NodeId> {
        let id = group.id();
        self.ensure_unused(id)?;
        let now = self.clock.now();
        let target = self
            .groups
            .get_mut(&parent)
            .ok_or(ModelError::GroupNotFound(parent))?;
        target.children.push(id);
        group.parent = Some(parent);
        group.children.clear();
        group.entries.clear();
        self.groups.insert(id, group);
        self.touch_group(Some(parent), now);
        Ok(id)
    }

    /// Moves an entry to the end of `group`. Returns false when it is
    /// already there.
    pub fn move_entry(&mut self, id: NodeId, group: NodeId) -> ModelResult<bool> {
        if !self.groups.contains_key(&group) {
            return Err(ModelError::GroupNotFound(group));
        }
        let now = self.clock.now();
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(ModelError::EntryNotFound(id))?;
        let previous = entry.group;
        if previous == Some(group) {
            return Ok(false);
        }
        entry.group = Some(group);
        if entry.update_time_info {
            entry.time_info_mut().set_location_changed(now);
        }
        if let Some(old) = previous.and_then(|p| self.groups.get_mut(&p)) {
            old.entries.retain(|e| *e != id);
        }
        if let Some(new) = self.groups.get_mut(&group) {
            new.entries.push(id);
        }
        self.touch_group(previous, now);
        self.touch_group(Some(group), now);
        Ok(true)
    }

    /// Moves a group (with its subtree) to the end of `parent`. Returns
    /// false when it is already there.
    pub fn move_group(&mut self, id: NodeId, parent: NodeId) -> ModelResult<bool> {
        if id == self.root {
            return Err(ModelError::RootImmutable);
        }
        if !self.groups.contains_key(&parent) {
            return Err(ModelError::GroupNotFound(parent));
        }
        if id == parent || self.is_ancestor_of(id, parent) {
            return Err(ModelError::Cycle { group: id, parent });
        }
        let now = self.clock.now();
        let group = self
            .groups
            .get_mut(&id)
            .ok_or(ModelError::GroupNotFound(id))?;
        let previous = group.parent;
        if previous == Some(parent) {
            return Ok(false);
        }
        group.parent = Some(parent);
        if group.update_time_info {
            group.time_info_mut().set_location_changed(now);
        }
        if let Some(old) = previous.and_then(|p| self.groups.get_mut(&p)) {
            old.children.retain(|c| *c != id);
        }
        if let Some(new) = self.groups.get_mut(&parent) {
            new.children.push(id);
        }
        self.touch_group(previous, now);
        self.touch_group(Some(parent), now);
        Ok(true)
    }

    // ── Editing ──────────────────────────────────────────────────

    /// Edits an entry the way a user would.
    ///
    /// When `edit` changes the entry's content, the prior state is appended
    /// to history (bounded by the history limit) and, if tracking is on,
    /// the modification time is refreshed. Returns whether content changed.
    pub fn update_entry<F>(&mut self, id: NodeId, edit: F) -> ModelResult<bool>
    where
        F: FnOnce(&mut Entry),
    {
        let now = self.clock.now();
        let max_items = self.metadata.history_max_items;
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(ModelError::EntryNotFound(id))?;
        let before = entry.snapshot();
        edit(entry);
        if entry.content_eq(&before) {
            return Ok(false);
        }
        entry.history.push(before);
        truncate_history(&mut entry.history, max_items);
        if entry.update_time_info {
            entry.time_info_mut().set_last_modification_time(now);
            entry.time_info_mut().set_last_access_time(now);
        }
        Ok(true)
    }

    /// Sets one attribute without recording a history snapshot.
    pub fn set_entry_attribute(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> ModelResult<()> {
        let now = self.clock.now();
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(ModelError::EntryNotFound(id))?;
        entry.set_attribute(key, value);
        if entry.update_time_info {
            entry.time_info_mut().set_last_modification_time(now);
        }
        Ok(())
    }

    /// Edits a group's properties. Returns whether anything changed.
    pub fn update_group<F>(&mut self, id: NodeId, edit: F) -> ModelResult<bool>
    where
        F: FnOnce(&mut Group),
    {
        let now = self.clock.now();
        let group = self
            .groups
            .get_mut(&id)
            .ok_or(ModelError::GroupNotFound(id))?;
        let before = group.props();
        edit(group);
        if group.props() == before {
            return Ok(false);
        }
        if group.update_time_info {
            group.time_info_mut().set_last_modification_time(now);
        }
        Ok(true)
    }

    /// Overwrites an entry's time stamps verbatim.
    pub fn set_entry_time_info(
        &mut self,
        id: NodeId,
        time_info: vaultsync_types::TimeInfo,
    ) -> ModelResult<()> {
        self.entries
            .get_mut(&id)
            .ok_or(ModelError::EntryNotFound(id))?
            .set_time_info(time_info);
        Ok(())
    }

    /// Overwrites a group's time stamps verbatim.
    pub fn set_group_time_info(
        &mut self,
        id: NodeId,
        time_info: vaultsync_types::TimeInfo,
    ) -> ModelResult<()> {
        self.groups
            .get_mut(&id)
            .ok_or(ModelError::GroupNotFound(id))?
            .set_time_info(time_info);
        Ok(())
    }

    /// Replaces an entry's whole history.
    ///
    /// Items are normalised into snapshots of this entry. Counts as a
    /// modification of the entry when tracking is on.
    pub fn set_entry_history(&mut self, id: NodeId, items: Vec<Entry>) -> ModelResult<()> {
        let now = self.clock.now();
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(ModelError::EntryNotFound(id))?;
        entry.history = items.iter().map(|item| item.snapshot_as(id)).collect();
        if entry.update_time_info {
            entry.time_info_mut().set_last_modification_time(now);
        }
        Ok(())
    }

    /// Drops the oldest history snapshots beyond the configured limit.
    /// Returns how many were dropped.
    pub fn truncate_entry_history(&mut self, id: NodeId) -> ModelResult<usize> {
        let max_items = self.metadata.history_max_items;
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(ModelError::EntryNotFound(id))?;
        Ok(truncate_history(&mut entry.history, max_items))
    }

    /// Swaps a live entry for `replacement`, keeping its group, position
    /// and tracking setting. Returns the entry that was replaced.
    pub fn replace_entry(&mut self, id: NodeId, mut replacement: Entry) -> ModelResult<Entry> {
        if replacement.id() != id {
            return Err(ModelError::IdMismatch {
                expected: id,
                found: replacement.id(),
            });
        }
        let now = self.clock.now();
        let current = self
            .entries
            .get(&id)
            .ok_or(ModelError::EntryNotFound(id))?;
        let group = current.group;
        replacement.group = group;
        replacement.update_time_info = current.update_time_info;
        let old = self
            .entries
            .insert(id, replacement)
            .ok_or(ModelError::EntryNotFound(id))?;
        self.touch_group(group, now);
        Ok(old)
    }

    /// Flags an entry as the older of two copies kept side by side.
    pub fn mark_older_entry(&mut self, id: NodeId) -> ModelResult<()> {
        let marker = merged_marker(&self.metadata.name);
        self.set_entry_attribute(id, attr::MERGED, marker)
    }

    // ── Removal ──────────────────────────────────────────────────

    /// Deletes an entry as a user would, recording a tombstone.
    pub fn delete_entry(&mut self, id: NodeId) -> ModelResult<()> {
        let now = self.clock.now();
        self.erase_entry(id)?;
        self.deleted_objects.record(id, now);
        debug!("Deleted entry {}", id);
        Ok(())
    }

    /// Deletes a group and everything below it as a user would, recording a
    /// tombstone for every removed node.
    pub fn delete_group(&mut self, id: NodeId) -> ModelResult<()> {
        let now = self.clock.now();
        let (groups, entries) = self.erase_group(id)?;
        for node in entries.iter().chain(groups.iter()) {
            self.deleted_objects.record(*node, now);
        }
        debug!("Deleted group {} ({} nodes)", id, groups.len() + entries.len());
        Ok(())
    }

    /// Removes an entry from the tree without touching the tombstone ledger.
    pub fn erase_entry(&mut self, id: NodeId) -> ModelResult<Entry> {
        let now = self.clock.now();
        let entry = self
            .entries
            .remove(&id)
            .ok_or(ModelError::EntryNotFound(id))?;
        if let Some(group) = entry.group.and_then(|g| self.groups.get_mut(&g)) {
            group.entries.retain(|e| *e != id);
        }
        self.touch_group(entry.group, now);
        Ok(entry)
    }

    /// Removes a group and its subtree without touching the tombstone
    /// ledger. Returns the removed group ids (deepest first) and entry ids.
    pub fn erase_group(&mut self, id: NodeId) -> ModelResult<(Vec<NodeId>, Vec<NodeId>)> {
        if id == self.root {
            return Err(ModelError::RootImmutable);
        }
        let now = self.clock.now();
        let parent = self
            .groups
            .get(&id)
            .ok_or(ModelError::GroupNotFound(id))?
            .parent;
        let entries: Vec<NodeId> = self.entries_recursive(id).iter().map(|e| e.id()).collect();
        let mut groups: Vec<NodeId> = self.groups_recursive(id).iter().map(|g| g.id()).collect();
        groups.reverse();
        groups.push(id);

        for entry in &entries {
            self.entries.remove(entry);
        }
        for group in &groups {
            self.groups.remove(group);
        }
        if let Some(p) = parent.and_then(|p| self.groups.get_mut(&p)) {
            p.children.retain(|c| *c != id);
        }
        self.touch_group(parent, now);
        Ok((groups, entries))
    }

    // ── Validation ───────────────────────────────────────────────

    /// Checks the tree invariants of a replica built from external data:
    /// single root, consistent parent/child links, every node reachable.
    pub fn validate(&self) -> ModelResult<()> {
        let inconsistent = |msg: String| -> ModelResult<()> { Err(ModelError::Inconsistent(msg)) };
        match self.groups.get(&self.root) {
            None => return inconsistent(format!("root group {} missing", self.root)),
            Some(root) if root.parent.is_some() => {
                return inconsistent("root group has a parent".to_string());
            }
            Some(_) => {}
        }
        for (id, group) in &self.groups {
            if self.entries.contains_key(id) {
                return inconsistent(format!("{id} is both a group and an entry"));
            }
            for child in &group.children {
                match self.groups.get(child) {
                    Some(c) if c.parent == Some(*id) => {}
                    _ => return inconsistent(format!("child {child} of {id} is not linked back")),
                }
            }
            for entry in &group.entries {
                match self.entries.get(entry) {
                    Some(e) if e.group == Some(*id) => {}
                    _ => return inconsistent(format!("entry {entry} of {id} is not linked back")),
                }
            }
        }
        if self.groups_recursive(self.root).len() + 1 != self.groups.len() {
            return inconsistent("unreachable or cyclic groups".to_string());
        }
        if self.entries_recursive(self.root).len() != self.entries.len() {
            return inconsistent("unreachable entries".to_string());
        }
        for entry in self.entries.values() {
            if entry.history.iter().any(|h| !h.history.is_empty()) {
                return inconsistent(format!("history of {} is nested", entry.id()));
            }
        }
        Ok(())
    }
}

/// Keeps the newest `max_items` snapshots. Returns how many were dropped.
fn truncate_history(history: &mut Vec<Entry>, max_items: usize) -> usize {
    let excess = history.len().saturating_sub(max_items);
    history.drain(..excess);
    excess
}

/// Text of the marker left on the older copy when both copies are kept.
#[must_use]
pub fn merged_marker(database_name: &str) -> String {
    format!("older entry merged from database \"{database_name}\"")
}
