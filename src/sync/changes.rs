// ============================================================================
// Change Tracking
// ============================================================================
//
// A synchronization pass records one Change per entity it creates, touches
// or drops. The gateway applies the whole set atomically at commit, after
// re-checking every recorded version against the stored one.
//
// ============================================================================

use crate::core::{EntityKind, Version};
use std::collections::HashMap;

/// One pending write produced by a synchronization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A new entity with an unassigned id
    Insert { kind: EntityKind },

    /// An existing entity whose own fields, snapshots or owned membership changed
    Update {
        kind: EntityKind,
        id: u64,
        expected_version: Version,
    },

    /// An orphan, or an entity inside an orphan's subtree
    Delete {
        kind: EntityKind,
        id: u64,
        expected_version: Version,
    },
}

impl Change {
    pub fn kind(&self) -> EntityKind {
        match self {
            Change::Insert { kind } => *kind,
            Change::Update { kind, .. } => *kind,
            Change::Delete { kind, .. } => *kind,
        }
    }

    /// Persisted id and version this change was computed against.
    pub fn expectation(&self) -> Option<(EntityKind, u64, Version)> {
        match self {
            Change::Insert { .. } => None,
            Change::Update {
                kind,
                id,
                expected_version,
            }
            | Change::Delete {
                kind,
                id,
                expected_version,
            } => Some((*kind, *id, *expected_version)),
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Change::Insert { .. })
    }

    pub fn is_update(&self) -> bool {
        matches!(self, Change::Update { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Change::Delete { .. })
    }
}

/// Ordered list of changes from one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: EntityKind) {
        self.changes.push(Change::Insert { kind });
    }

    pub fn update(&mut self, kind: EntityKind, id: u64, expected_version: Version) {
        self.changes.push(Change::Update {
            kind,
            id,
            expected_version,
        });
    }

    pub fn delete(&mut self, kind: EntityKind, id: u64, expected_version: Version) {
        self.changes.push(Change::Delete {
            kind,
            id,
            expected_version,
        });
    }

    pub fn extend(&mut self, other: ChangeSet) {
        self.changes.extend(other.changes);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn inserts(&self) -> usize {
        self.changes.iter().filter(|c| c.is_insert()).count()
    }

    pub fn updates(&self) -> usize {
        self.changes.iter().filter(|c| c.is_update()).count()
    }

    pub fn deletes(&self) -> usize {
        self.changes.iter().filter(|c| c.is_delete()).count()
    }

    /// Whether `(kind, id)` is recorded as updated.
    pub fn touched(&self, kind: EntityKind, id: u64) -> bool {
        self.changes.iter().any(|change| {
            matches!(change, Change::Update { kind: k, id: i, .. } if *k == kind && *i == id)
        })
    }

    /// Updated entities, keyed for version stamping at commit.
    pub fn updated_versions(&self) -> HashMap<(EntityKind, u64), Version> {
        self.changes
            .iter()
            .filter_map(|change| match change {
                Change::Update {
                    kind,
                    id,
                    expected_version,
                } => Some(((*kind, *id), *expected_version)),
                _ => None,
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
