//! Shared fixtures for merge tests.

#![allow(dead_code)]

use std::sync::Arc;
use vaultsync_merge::{MergeReport, Merger};
use vaultsync_model::{Database, Entry, Group};
use vaultsync_types::{ManualClock, NodeId};

/// A clock frozen at the instant every merge scenario starts from.
pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at(2010, 5, 5, 10, 30, 10))
}

/// Root with two groups; `group1` holds `entry1` and `entry2`, each with
/// one history snapshot. The entries are titled a year after creation.
pub fn create_test_database(clock: &Arc<ManualClock>) -> Database {
    let mut db = Database::with_clock(clock.clone());
    let group1 = Group::new("group1", db.now());
    let group2 = Group::new("group2", db.now());
    let entry1 = Entry::new(db.now());
    let entry2 = Entry::new(db.now());

    clock.advance_years(1);

    let root = db.root();
    let g1 = db.add_group(root, group1).unwrap();
    db.add_group(root, group2).unwrap();
    let e1 = db.add_entry(g1, entry1).unwrap();
    db.update_entry(e1, |e| e.set_title("entry1")).unwrap();
    let e2 = db.add_entry(g1, entry2).unwrap();
    db.update_entry(e2, |e| e.set_title("entry2")).unwrap();
    db
}

/// An independent replica with the same tree, identifiers and stamps.
pub fn structure_clone(db: &Database) -> Database {
    let mut copy = db.clone();
    copy.clear_modified();
    copy
}

pub fn entry_id(db: &Database, title: &str) -> NodeId {
    db.find_entry_by_title(title)
        .unwrap_or_else(|| panic!("no entry titled {title}"))
        .id()
}

pub fn group_id(db: &Database, name: &str) -> NodeId {
    db.find_group_by_name(name)
        .unwrap_or_else(|| panic!("no group named {name}"))
        .id()
}

pub fn merge(source: &Database, target: &mut Database) -> MergeReport {
    Merger::new(source, target).merge().unwrap()
}

/// Serialized form of a replica, for byte-level comparisons.
pub fn snapshot(db: &Database) -> serde_json::Value {
    serde_json::to_value(db).unwrap()
}
