//! Property tests: after two replicas diverge through arbitrary edits, a
//! second merge of the same source changes nothing.

mod common;

use common::{create_test_database, snapshot, structure_clone, test_clock};
use proptest::prelude::*;
use std::sync::Arc;
use vaultsync_merge::{MergeConfig, MergeMode, Merger};
use vaultsync_model::{Database, Entry, Group};
use vaultsync_types::{ManualClock, NodeId};

#[derive(Debug, Clone)]
enum Edit {
    Touch(usize),
    AddEntry(usize),
    DeleteEntry(usize),
    MoveEntry(usize, usize),
    AddGroup(usize),
    DeleteGroup(usize),
    RenameGroup(usize),
    MoveGroup(usize, usize),
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => (0..32usize).prop_map(Edit::Touch),
        2 => (0..32usize).prop_map(Edit::AddEntry),
        1 => (0..32usize).prop_map(Edit::DeleteEntry),
        2 => (0..32usize, 0..32usize).prop_map(|(e, g)| Edit::MoveEntry(e, g)),
        1 => (0..32usize).prop_map(Edit::AddGroup),
        1 => (0..32usize).prop_map(Edit::DeleteGroup),
        1 => (0..32usize).prop_map(Edit::RenameGroup),
        1 => (0..32usize, 0..32usize).prop_map(|(a, b)| Edit::MoveGroup(a, b)),
    ]
}

fn arb_mode() -> impl Strategy<Value = MergeMode> {
    prop_oneof![
        Just(MergeMode::KeepNewer),
        Just(MergeMode::KeepExisting),
        Just(MergeMode::Synchronize),
    ]
}

fn pick(ids: &[NodeId], index: usize) -> Option<NodeId> {
    (!ids.is_empty()).then(|| ids[index % ids.len()])
}

/// Applies `edit` a second after the previous one. Edits the tree refuses
/// (cycles, for one) are skipped.
fn apply(db: &mut Database, clock: &Arc<ManualClock>, edit: &Edit) {
    let now = clock.advance_seconds(1);
    let root = db.root();
    let entries: Vec<NodeId> = db.entries_recursive(root).iter().map(|e| e.id()).collect();
    let subgroups: Vec<NodeId> = db.groups_recursive(root).iter().map(|g| g.id()).collect();
    let mut groups = vec![root];
    groups.extend(&subgroups);

    match *edit {
        Edit::Touch(i) => {
            if let Some(id) = pick(&entries, i) {
                db.update_entry(id, |e| e.set_notes(now.to_rfc3339())).unwrap();
            }
        }
        Edit::AddEntry(g) => {
            if let Some(group) = pick(&groups, g) {
                let mut entry = Entry::new(now);
                entry.set_title(format!("entry {}", now.timestamp()));
                db.add_entry(group, entry).unwrap();
            }
        }
        Edit::DeleteEntry(i) => {
            if let Some(id) = pick(&entries, i) {
                db.delete_entry(id).unwrap();
            }
        }
        Edit::MoveEntry(i, g) => {
            if let (Some(id), Some(group)) = (pick(&entries, i), pick(&groups, g)) {
                db.move_entry(id, group).unwrap();
            }
        }
        Edit::AddGroup(g) => {
            if let Some(parent) = pick(&groups, g) {
                let group = Group::new(format!("group {}", now.timestamp()), now);
                db.add_group(parent, group).unwrap();
            }
        }
        Edit::DeleteGroup(g) => {
            if let Some(id) = pick(&subgroups, g) {
                db.delete_group(id).unwrap();
            }
        }
        Edit::RenameGroup(g) => {
            if let Some(id) = pick(&subgroups, g) {
                db.update_group(id, |group| group.set_name(format!("renamed {}", now.timestamp())))
                    .unwrap();
            }
        }
        Edit::MoveGroup(a, b) => {
            if let (Some(id), Some(parent)) = (pick(&subgroups, a), pick(&groups, b)) {
                let _ = db.move_group(id, parent);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn second_merge_is_a_no_op(
        source_edits in prop::collection::vec(arb_edit(), 0..10),
        target_edits in prop::collection::vec(arb_edit(), 0..10),
        mode in arb_mode(),
    ) {
        let clock = test_clock();
        let mut target = create_test_database(&clock);
        let mut source = structure_clone(&target);
        for edit in &source_edits {
            apply(&mut source, &clock, edit);
        }
        for edit in &target_edits {
            apply(&mut target, &clock, edit);
        }

        let config = MergeConfig::forced(mode);
        clock.advance_seconds(1);
        Merger::new(&source, &mut target).with_config(&config).merge().unwrap();
        target.validate().unwrap();
        let merged = snapshot(&target);

        clock.advance_seconds(1);
        let report = Merger::new(&source, &mut target).with_config(&config).merge().unwrap();
        prop_assert!(report.is_empty(), "second merge changed: {}", report);
        prop_assert_eq!(snapshot(&target), merged);
    }

    #[test]
    fn merge_keeps_the_tree_consistent(
        source_edits in prop::collection::vec(arb_edit(), 0..12),
        target_edits in prop::collection::vec(arb_edit(), 0..12),
    ) {
        let clock = test_clock();
        let mut target = create_test_database(&clock);
        let mut source = structure_clone(&target);
        for edit in &source_edits {
            apply(&mut source, &clock, edit);
        }
        for edit in &target_edits {
            apply(&mut target, &clock, edit);
        }

        clock.advance_seconds(1);
        let mut merger = Merger::new(&source, &mut target);
        merger.set_forced_merge_mode(MergeMode::KeepBoth);
        merger.merge().unwrap();
        prop_assert!(target.validate().is_ok());
        for entry in source.entries() {
            let live = target.entry(entry.id()).is_some();
            let deleted = target.contains_deleted_object(entry.id());
            prop_assert!(live || deleted, "entry {} vanished without a tombstone", entry.id());
        }
    }
}
