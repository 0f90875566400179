//! Conflict resolution for nodes present on both replicas.

use crate::change::Change;
use crate::error::MergeResult;
use crate::history::merge_history;
use tracing::debug;
use vaultsync_model::{CloneFlags, Database, Entry, Group, MergeMode, NodeRef};
use vaultsync_types::{NodeId, Precision};

/// Brings a target group up to date with a strictly newer source group.
///
/// Name, notes, icon and expiry are copied. The target's modification time
/// is then set to the source's instead of being left at its old value; this
/// is a deliberate departure from a plain field copy, and it lets the next
/// merge see the pair as equal.
pub(crate) fn resolve_group_conflict(
    target: &mut Database,
    source_group: &Group,
) -> MergeResult<Option<Change>> {
    let id = source_group.id();
    let Some(existing) = target.group(id) else {
        return Ok(None);
    };
    let source_time = source_group
        .time_info()
        .last_modification_time(Precision::High);
    if existing.time_info().last_modification_time(Precision::High) >= source_time {
        return Ok(None);
    }

    let mut target = target.suspend_time_updates(&[NodeRef::Group(id)]);
    target.update_group(id, |group| {
        group.set_name(source_group.name());
        group.set_notes(source_group.notes());
        group.set_icon(source_group.icon());
        group.set_expiry_time(source_group.time_info().expiry_time(Precision::High));
        let mut time_info = group.time_info().clone();
        time_info.set_last_modification_time(source_time);
        group.set_time_info(time_info);
    })?;
    Ok(Some(Change::Overwritten {
        name: source_group.name().to_string(),
        id,
    }))
}

/// Resolves an entry that exists on both sides under `mode`.
///
/// `group` is the target group matching the source entry's group; backup
/// copies land there. Modification times compare at serialized precision.
pub(crate) fn resolve_entry_conflict(
    target: &mut Database,
    source_entry: &Entry,
    group: NodeId,
    mode: MergeMode,
) -> MergeResult<Option<Change>> {
    let id = source_entry.id();
    let Some(existing) = target.entry(id) else {
        return Ok(None);
    };
    let time_target = existing
        .time_info()
        .last_modification_time(Precision::Serialized);
    let time_source = source_entry
        .time_info()
        .last_modification_time(Precision::Serialized);
    if time_target == time_source {
        return Ok(None);
    }
    let target_is_newer = time_target > time_source;

    match mode {
        MergeMode::KeepExisting => Ok(None),
        MergeMode::KeepNewer if target_is_newer => Ok(None),
        MergeMode::KeepNewer => {
            debug!("Updating entry {}", existing.title());
            let current_group = existing.group();
            let replacement = source_entry.clone_with(CloneFlags::INCLUDE_HISTORY);
            let mut target = target.suspend_time_updates(&group_refs(current_group));
            target.replace_entry(id, replacement)?;
            Ok(Some(Change::Overwritten {
                name: source_entry.title().to_string(),
                id,
            }))
        }
        MergeMode::KeepBoth => {
            let backup = source_entry.clone_with(CloneFlags::NEW_ID_WITH_HISTORY);
            let backup_id = backup.id();
            let change = if target_is_newer {
                Change::BackupForOlderSource {
                    name: source_entry.title().to_string(),
                    id,
                }
            } else {
                Change::BackupForOlderTarget {
                    name: existing.title().to_string(),
                    id,
                }
            };
            let older = if target_is_newer { backup_id } else { id };
            let mut target = target.suspend_time_updates(&[
                NodeRef::Group(group),
                NodeRef::Entry(id),
            ]);
            target.add_entry(group, backup)?;
            let mut target = target.suspend_time_updates(&[NodeRef::Entry(backup_id)]);
            target.mark_older_entry(older)?;
            Ok(Some(change))
        }
        MergeMode::Synchronize if target_is_newer => {
            let max_items = target.metadata().history_max_items;
            let Some(history) = merge_history(source_entry, existing, max_items) else {
                return Ok(None);
            };
            let name = existing.title().to_string();
            let mut target = target.suspend_time_updates(&[NodeRef::Entry(id)]);
            target.set_entry_history(id, history)?;
            target.truncate_entry_history(id)?;
            Ok(Some(Change::SynchronizedFromOlderSource { name, id }))
        }
        MergeMode::Synchronize => {
            let name = existing.title().to_string();
            let current_group = existing.group();
            let max_items = target.metadata().history_max_items;
            let replacement = source_entry.clone_with(CloneFlags::INCLUDE_HISTORY);
            let history = merge_history(existing, &replacement, max_items);
            debug!("Synchronizing {} with the newer source on top", name);

            let mut refs = group_refs(current_group);
            refs.push(NodeRef::Entry(id));
            let mut target = target.suspend_time_updates(&refs);
            target.replace_entry(id, replacement)?;
            if let Some(history) = history {
                target.set_entry_history(id, history)?;
                target.truncate_entry_history(id)?;
            }
            Ok(Some(Change::SynchronizedFromNewerSource { name, id }))
        }
    }
}

fn group_refs(group: Option<NodeId>) -> Vec<NodeRef> {
    group.map(NodeRef::Group).into_iter().collect()
}
