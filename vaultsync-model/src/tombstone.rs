//! Tombstone ledger: the record of deleted identifiers.
//!
//! A replica keeps at most one [`DeletedObject`] per identifier. The ledger
//! lets a deletion reach a replica that never saw the node go away.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vaultsync_types::NodeId;

/// A deleted node and the instant it was deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedObject {
    pub id: NodeId,
    pub deletion_time: DateTime<Utc>,
}

impl DeletedObject {
    #[must_use]
    pub fn new(id: NodeId, deletion_time: DateTime<Utc>) -> Self {
        Self { id, deletion_time }
    }
}

/// Ordered list of tombstones, one per identifier.
///
/// `index` maps each identifier to its position in `objects`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DeletedObject>", into = "Vec<DeletedObject>")]
pub struct TombstoneLedger {
    objects: Vec<DeletedObject>,
    index: BTreeMap<NodeId, usize>,
}

impl TombstoneLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeletedObject> {
        self.objects.iter()
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&DeletedObject> {
        self.index.get(&id).map(|&i| &self.objects[i])
    }

    /// Records a deletion. An existing tombstone for the same identifier is
    /// refreshed in place rather than duplicated.
    pub fn record(&mut self, id: NodeId, deletion_time: DateTime<Utc>) {
        match self.index.get(&id) {
            Some(&i) => self.objects[i].deletion_time = deletion_time,
            None => {
                self.index.insert(id, self.objects.len());
                self.objects.push(DeletedObject::new(id, deletion_time));
            }
        }
    }

    /// Appends a tombstone as-is, keeping ledger order.
    pub fn push(&mut self, object: DeletedObject) {
        self.record(object.id, object.deletion_time);
    }

    pub fn remove(&mut self, id: NodeId) -> Option<DeletedObject> {
        let position = self.index.remove(&id)?;
        let removed = self.objects.remove(position);
        for object in &self.objects[position..] {
            if let Some(i) = self.index.get_mut(&object.id) {
                *i -= 1;
            }
        }
        Some(removed)
    }

    /// Unions two ledgers.
    ///
    /// Identifiers keep the order of first appearance (`self` first). When
    /// both ledgers hold the same identifier the earliest deletion time wins.
    #[must_use]
    pub fn union_earliest(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for object in &other.objects {
            match merged.index.get(&object.id) {
                Some(&i) => {
                    let existing = &mut merged.objects[i];
                    if object.deletion_time < existing.deletion_time {
                        existing.deletion_time = object.deletion_time;
                    }
                }
                None => merged.push(*object),
            }
        }
        merged
    }
}

impl From<Vec<DeletedObject>> for TombstoneLedger {
    fn from(objects: Vec<DeletedObject>) -> Self {
        objects.into_iter().collect()
    }
}

impl From<TombstoneLedger> for Vec<DeletedObject> {
    fn from(ledger: TombstoneLedger) -> Self {
        ledger.objects
    }
}

impl FromIterator<DeletedObject> for TombstoneLedger {
    fn from_iter<I: IntoIterator<Item = DeletedObject>>(iter: I) -> Self {
        let mut ledger = Self::new();
        for object in iter {
            ledger.push(object);
        }
        ledger
    }
}

impl<'a> IntoIterator for &'a TombstoneLedger {
    type Item = &'a DeletedObject;
    type IntoIter = std::slice::Iter<'a, DeletedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}
