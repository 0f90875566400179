//! Tree merge driver.
//!
//! Walks the source tree top-down. For every source node the target is
//! searched by identifier, anywhere in its tree; missing nodes are created
//! under the matching target group, present ones are relocated when the
//! source placement is newer and then handed to conflict resolution.
//! Entries of a group are handled before its child groups. A source group
//! the tombstones would erase again is not created, but what lies below it
//! is still resolved against the target.

use crate::change::Change;
use crate::config::MergeConfig;
use crate::conflict::{resolve_entry_conflict, resolve_group_conflict};
use crate::deletions::{entry_condemned, group_condemned, merge_deletions};
use crate::error::{MergeError, MergeResult};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};
use vaultsync_model::{CloneFlags, Database, Group, MergeMode, NodeRef, TombstoneLedger};
use vaultsync_types::{NodeId, Precision};

/// Outcome of a merge: every change applied to the target, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    changes: Vec<Change>,
}

impl MergeReport {
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    #[must_use]
    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }

    /// True when the target was modified.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for change in &self.changes {
            writeln!(f, "{change}")?;
        }
        Ok(())
    }
}

/// Merges a source replica (or subtree) into a target replica.
///
/// The source is only read. The target is mutated in place and flagged as
/// modified when anything changed.
#[derive(Debug)]
pub struct Merger<'a> {
    source: &'a Database,
    target: &'a mut Database,
    source_group: NodeId,
    target_group: NodeId,
    forced_mode: Option<MergeMode>,
}

impl<'a> Merger<'a> {
    /// Merges the whole of `source` into `target`.
    pub fn new(source: &'a Database, target: &'a mut Database) -> Self {
        let source_group = source.root();
        let target_group = target.root();
        Self {
            source,
            target,
            source_group,
            target_group,
            forced_mode: None,
        }
    }

    /// Merges the subtree under `source_group` into `target_group`.
    ///
    /// Fails without touching the target when either group is missing.
    pub fn for_groups(
        source: &'a Database,
        source_group: NodeId,
        target: &'a mut Database,
        target_group: NodeId,
    ) -> MergeResult<Self> {
        if source.group(source_group).is_none() {
            return Err(MergeError::GroupNotFound(source_group));
        }
        if target.group(target_group).is_none() {
            return Err(MergeError::GroupNotFound(target_group));
        }
        Ok(Self {
            source,
            target,
            source_group,
            target_group,
            forced_mode: None,
        })
    }

    /// Applies a configuration.
    #[must_use]
    pub fn with_config(mut self, config: &MergeConfig) -> Self {
        self.forced_mode = config.forced_mode;
        self
    }

    /// Uses `mode` for every group, ignoring per-group settings.
    pub fn set_forced_merge_mode(&mut self, mode: MergeMode) {
        self.forced_mode = Some(mode);
    }

    /// Returns to per-group policies.
    pub fn reset_forced_merge_mode(&mut self) {
        self.forced_mode = None;
    }

    #[must_use]
    pub fn forced_merge_mode(&self) -> Option<MergeMode> {
        self.forced_mode
    }

    /// Runs the merge: tree, then deletions, then metadata.
    pub fn merge(&mut self) -> MergeResult<MergeReport> {
        let ledger = self
            .target
            .deleted_objects()
            .union_earliest(self.source.deleted_objects());
        let mut changes = Vec::new();
        self.merge_group(self.source_group, self.target_group, &ledger, &mut changes)?;
        for change in merge_deletions(self.target, self.source.deleted_objects())? {
            record(&mut changes, change);
        }
        self.merge_metadata(&mut changes);

        if !changes.is_empty() {
            self.target.mark_as_modified();
        }
        info!(
            "Merged {} changes into {:?}",
            changes.len(),
            self.target.metadata().name
        );
        Ok(MergeReport { changes })
    }

    fn mode_for(&self, group: NodeId) -> MergeMode {
        self.forced_mode
            .unwrap_or_else(|| self.target.effective_merge_mode(group))
    }

    fn merge_group(
        &mut self,
        source_group: NodeId,
        target_group: NodeId,
        ledger: &TombstoneLedger,
        changes: &mut Vec<Change>,
    ) -> MergeResult<()> {
        let source = self.source;
        let mode = self.mode_for(target_group);

        for entry in source.entries_of(source_group) {
            let id = entry.id();
            let Some(existing) = self.target.entry(id) else {
                if entry_condemned(entry, ledger) {
                    debug!("Skipping deleted entry {}", id);
                    continue;
                }
                let copy = entry.clone_with(CloneFlags::INCLUDE_HISTORY);
                let mut target = self
                    .target
                    .suspend_time_updates(&[NodeRef::Group(target_group)]);
                target.add_entry(target_group, copy)?;
                record(
                    changes,
                    Change::Created {
                        name: entry.title().to_string(),
                        id,
                    },
                );
                continue;
            };

            let from = existing.group();
            let newer_location = existing.time_info().location_changed(Precision::High)
                < entry.time_info().location_changed(Precision::High);
            if newer_location && from != Some(target_group) {
                let mut nodes = vec![NodeRef::Entry(id), NodeRef::Group(target_group)];
                nodes.extend(from.map(NodeRef::Group));
                let mut target = self.target.suspend_time_updates(&nodes);
                target.move_entry(id, target_group)?;
                record(
                    changes,
                    Change::Relocated {
                        name: entry.title().to_string(),
                        id,
                    },
                );
            }
            if let Some(change) = resolve_entry_conflict(self.target, entry, target_group, mode)? {
                record(changes, change);
            }
        }

        for child in source.children_of(source_group) {
            let id = child.id();
            match self.target.group(id) {
                None => {
                    if group_condemned(source, self.target, child, ledger, self.forced_mode, mode) {
                        debug!("Skipping deleted group {}", id);
                        self.merge_condemned_group(child, mode, ledger, changes)?;
                        continue;
                    }
                    // The copy keeps the source's location-changed stamp.
                    let copy = child.clone_node();
                    let mut target = self
                        .target
                        .suspend_time_updates(&[NodeRef::Group(target_group)]);
                    target.add_group(target_group, copy)?;
                    record(
                        changes,
                        Change::Created {
                            name: child.name().to_string(),
                            id,
                        },
                    );
                }
                Some(existing) => {
                    let from = existing.parent();
                    let newer_location = existing.time_info().location_changed(Precision::High)
                        < child.time_info().location_changed(Precision::High);
                    if newer_location && from != Some(target_group) {
                        self.relocate_group(child.name(), id, from, target_group, changes)?;
                    }
                    if let Some(change) = resolve_group_conflict(self.target, child)? {
                        record(changes, change);
                    }
                }
            }
            self.merge_group(id, id, ledger, changes)?;
        }
        Ok(())
    }

    /// Walks a source group that is not recreated in the target. Nodes
    /// below it that already live elsewhere in the target stay where they
    /// are but still get conflict resolution.
    ///
    /// `parent_mode` is the policy where the group would have been created.
    fn merge_condemned_group(
        &mut self,
        group: &Group,
        parent_mode: MergeMode,
        ledger: &TombstoneLedger,
        changes: &mut Vec<Change>,
    ) -> MergeResult<()> {
        let source = self.source;
        let mode = self
            .forced_mode
            .or(group.merge_mode())
            .unwrap_or(parent_mode);

        for entry in source.entries_of(group.id()) {
            let Some(current) = self.target.entry(entry.id()).and_then(|e| e.group()) else {
                continue;
            };
            if let Some(change) = resolve_entry_conflict(self.target, entry, current, mode)? {
                record(changes, change);
            }
        }

        for child in source.children_of(group.id()) {
            let id = child.id();
            if self.target.group(id).is_none() {
                self.merge_condemned_group(child, mode, ledger, changes)?;
                continue;
            }
            if let Some(change) = resolve_group_conflict(self.target, child)? {
                record(changes, change);
            }
            self.merge_group(id, id, ledger, changes)?;
        }
        Ok(())
    }

    fn relocate_group(
        &mut self,
        name: &str,
        id: NodeId,
        from: Option<NodeId>,
        to: NodeId,
        changes: &mut Vec<Change>,
    ) -> MergeResult<()> {
        if id == to || self.target.is_ancestor_of(id, to) || from.is_none() {
            warn!("Not relocating group {} [{}]: it would leave the tree", name, id.to_hex());
            return Ok(());
        }
        let Some(source_group) = self.source.group(id) else {
            return Ok(());
        };
        let location = source_group.time_info().location_changed(Precision::High);

        let mut nodes = vec![NodeRef::Group(id), NodeRef::Group(to)];
        nodes.extend(from.map(NodeRef::Group));
        let mut target = self.target.suspend_time_updates(&nodes);
        target.move_group(id, to)?;
        if let Some(moved) = target.group(id) {
            let mut time_info = moved.time_info().clone();
            time_info.set_location_changed(location);
            target.set_group_time_info(id, time_info)?;
        }
        record(
            changes,
            Change::Relocated {
                name: name.to_string(),
                id,
            },
        );
        Ok(())
    }

    fn merge_metadata(&mut self, changes: &mut Vec<Change>) {
        let source = self.source.metadata();
        for (id, image) in &source.custom_icons {
            if !self.target.metadata().contains_custom_icon(*id) {
                self.target.metadata_mut().add_custom_icon(*id, image.clone());
                record(changes, Change::IconAdded { id: *id });
            }
        }
    }
}

fn record(changes: &mut Vec<Change>, change: Change) {
    debug!("{}", change);
    changes.push(change);
}
