//! Scoped suspension of automatic timestamp updates.

use crate::Database;
use std::ops::{Deref, DerefMut};
use vaultsync_types::NodeId;

/// A node whose timestamp tracking can be toggled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Entry(NodeId),
    Group(NodeId),
}

/// Guard returned by [`Database::suspend_time_updates`].
///
/// While alive, the listed nodes do not refresh their own time stamps on
/// mutation. Dropping the guard restores each node's previous setting, on
/// every exit path. Nodes erased while the guard was held are skipped.
#[must_use = "tracking is restored as soon as the guard is dropped"]
pub struct UpdateSuspension<'a> {
    db: &'a mut Database,
    saved: Vec<(NodeRef, bool)>,
}

impl<'a> UpdateSuspension<'a> {
    pub(crate) fn new(db: &'a mut Database, nodes: &[NodeRef]) -> Self {
        let mut saved = Vec::with_capacity(nodes.len());
        for &node in nodes {
            if let Some(previous) = db.set_time_tracking(node, false) {
                saved.push((node, previous));
            }
        }
        Self { db, saved }
    }
}

impl Deref for UpdateSuspension<'_> {
    type Target = Database;

    fn deref(&self) -> &Database {
        self.db
    }
}

impl DerefMut for UpdateSuspension<'_> {
    fn deref_mut(&mut self) -> &mut Database {
        self.db
    }
}

impl Drop for UpdateSuspension<'_> {
    fn drop(&mut self) {
        // Reverse order so a node listed twice ends at its original setting.
        for (node, previous) in self.saved.drain(..).rev() {
            self.db.set_time_tracking(node, previous);
        }
    }
}
