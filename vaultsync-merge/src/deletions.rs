//! Tombstone reconciliation.
//!
//! Runs once the trees are merged. The ledgers of both replicas are unioned
//! with the earliest deletion time winning, then every tombstone that names
//! a live target node is either applied (the node is erased) or dropped
//! because the node was edited after the deletion.

use crate::change::Change;
use crate::error::MergeResult;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::{debug, warn};
use vaultsync_model::{
    Database, DeletedObject, Entry, Group, MergeMode, NodeRef, TombstoneLedger,
};
use vaultsync_types::{Precision, TimeInfo};

/// Applies the union of both ledgers to the merged target and installs the
/// resulting ledger.
///
/// Kept tombstones come out in a fixed order: those with no live node, then
/// those of erased entries, then those of erased groups.
pub(crate) fn merge_deletions(
    target: &mut Database,
    source_ledger: &TombstoneLedger,
) -> MergeResult<Vec<Change>> {
    let union = target.deleted_objects().union_earliest(source_ledger);
    let mut deletions = TombstoneLedger::new();
    let mut entries = Vec::new();
    let mut groups = VecDeque::new();
    for object in &union {
        if target.entry(object.id).is_some() {
            entries.push(*object);
        } else if target.group(object.id).is_some() {
            groups.push_back(*object);
        } else {
            deletions.push(*object);
        }
    }

    let mut changes = Vec::new();
    let mut erased_entries = Vec::new();
    for object in entries {
        let Some(entry) = target.entry(object.id) else {
            continue;
        };
        if entry.time_info().last_modification_time(Precision::High) > object.deletion_time {
            debug!("Keeping {} edited after its deletion", object.id);
            continue;
        }
        let name = entry.title().to_string();
        let parent: Vec<NodeRef> = entry.group().map(NodeRef::Group).into_iter().collect();
        let mut target = target.suspend_time_updates(&parent);
        target.erase_entry(object.id)?;
        erased_entries.push(object);
        changes.push(Change::Deleted {
            name,
            id: object.id,
        });
    }

    let mut erased_groups = Vec::new();
    while let Some(object) = groups.pop_front() {
        let Some(group) = target.group(object.id) else {
            continue;
        };
        if group
            .children()
            .iter()
            .any(|child| groups.iter().any(|pending| pending.id == *child))
        {
            // Children first.
            groups.push_back(object);
            continue;
        }
        if group.time_info().last_modification_time(Precision::High) > object.deletion_time {
            debug!("Keeping group {} edited after its deletion", object.id);
            continue;
        }
        if !target.entries_recursive(object.id).is_empty()
            || !target.groups_recursive(object.id).is_empty()
        {
            debug!("Keeping group {} with live content", object.id);
            continue;
        }
        let Some(parent) = group.parent() else {
            warn!("Ignoring tombstone for root group {}", object.id);
            continue;
        };
        let name = group.name().to_string();
        let mut target = target.suspend_time_updates(&[NodeRef::Group(parent)]);
        target.erase_group(object.id)?;
        erased_groups.push(object);
        changes.push(Change::Deleted {
            name,
            id: object.id,
        });
    }

    for object in erased_entries.into_iter().chain(erased_groups) {
        deletions.push(object);
    }
    if deletions != *target.deleted_objects() {
        changes.push(Change::DeletedObjectsChanged);
    }
    target.set_deleted_objects(deletions);
    Ok(changes)
}

/// True when `entry` is condemned by `ledger`: deleted at or after its last
/// modification, so the reconciler would erase it again.
pub(crate) fn entry_condemned(entry: &Entry, ledger: &TombstoneLedger) -> bool {
    let modified = entry.time_info().last_modification_time(Precision::High);
    tombstone_outlives(ledger.get(entry.id()), modified)
}

/// True when a source group absent from the target would be created only to
/// be erased by the reconciler: it is condemned itself and nothing below it
/// would bring live content into it.
///
/// `mode` is the policy in force where the group would be created.
pub(crate) fn group_condemned(
    source: &Database,
    target: &Database,
    group: &Group,
    ledger: &TombstoneLedger,
    forced: Option<MergeMode>,
    mode: MergeMode,
) -> bool {
    let modified = group.time_info().last_modification_time(Precision::High);
    if !tombstone_outlives(ledger.get(group.id()), modified) {
        return false;
    }
    let mode = forced.or(group.merge_mode()).unwrap_or(mode);

    let entries_stay_out = source
        .entries_of(group.id())
        .all(|entry| match target.entry(entry.id()) {
            None => entry_condemned(entry, ledger),
            Some(existing) => {
                !moves_in(existing.time_info(), entry.time_info())
                    && !adds_backup(existing, entry, mode)
            }
        });
    entries_stay_out
        && source
            .children_of(group.id())
            .all(|child| match target.group(child.id()) {
                None => group_condemned(source, target, child, ledger, forced, mode),
                Some(existing) => !moves_in(existing.time_info(), child.time_info()),
            })
}

fn tombstone_outlives(tombstone: Option<&DeletedObject>, modified: DateTime<Utc>) -> bool {
    tombstone.is_some_and(|t| t.deletion_time >= modified)
}

fn moves_in(target: &TimeInfo, source: &TimeInfo) -> bool {
    target.location_changed(Precision::High) < source.location_changed(Precision::High)
}

fn adds_backup(existing: &Entry, source: &Entry, mode: MergeMode) -> bool {
    mode == MergeMode::KeepBoth
        && existing
            .time_info()
            .last_modification_time(Precision::Serialized)
            != source
                .time_info()
                .last_modification_time(Precision::Serialized)
}
