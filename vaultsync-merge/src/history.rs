//! Revision history reconciliation.
//!
//! Snapshots are keyed by their last-modification time at serialized
//! precision. Two snapshots with the same key are taken to be the same
//! revision, whichever replica they came from.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use vaultsync_model::Entry;
use vaultsync_types::{CompareOptions, Precision};

fn key(entry: &Entry) -> DateTime<Utc> {
    entry.time_info().last_modification_time(Precision::Serialized)
}

/// Combines the histories of two versions of the same entry.
///
/// `target` is the version that stays live. Its history seeds the result;
/// source snapshots fill in revisions the target lacks; the older of the two
/// live states becomes a snapshot too, unless its revision is already
/// present. Returns the new history, oldest first, or `None` when the newest
/// `max_items` positions match what `target` already holds.
#[must_use]
pub fn merge_history(source: &Entry, target: &Entry, max_items: usize) -> Option<Vec<Entry>> {
    let mut merged: BTreeMap<DateTime<Utc>, Entry> = BTreeMap::new();
    for item in target.history() {
        merged.insert(key(item), item.snapshot());
    }
    for item in source.history() {
        merged.entry(key(item)).or_insert_with(|| item.snapshot());
    }

    let target_time = key(target);
    let source_time = key(source);
    if target_time < source_time {
        merged.entry(target_time).or_insert_with(|| target.snapshot());
    } else if target_time > source_time {
        merged.entry(source_time).or_insert_with(|| source.snapshot());
    }

    let updated: Vec<Entry> = merged.into_values().collect();
    let current = target.history();
    let changed = (1..=max_items).any(|back| {
        let old = current.len().checked_sub(back).map(|i| &current[i]);
        let new = updated.len().checked_sub(back).map(|i| &updated[i]);
        match (old, new) {
            (None, None) => false,
            (Some(old), Some(new)) => !old.equals(new, CompareOptions::IGNORE_MILLISECONDS),
            _ => true,
        }
    });
    changed.then_some(updated)
}
