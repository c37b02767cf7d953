// ============================================================================
// Optimistic Concurrency
// ============================================================================
//
// Version tokens are checked twice: once by the synchronizer against the
// tree it loaded, and once by the gateway against the stored tree inside
// its commit. Only the second check can see interference between load and
// commit. The commit replaces the whole tree, so it also requires the stored
// tree to still match the one the pass loaded, entity for entity.
//
// ============================================================================

use super::changes::ChangeSet;
use crate::core::{EntityId, EntityKind, Result, SyncError, Version};
use crate::model::{Game, Sequence, VersionIndex};
use tracing::warn;

pub struct ConcurrencyGuard;

impl ConcurrencyGuard {
    /// Compares an incoming version token with the persisted version.
    ///
    /// A candidate without a token is accepted as is.
    pub fn check(
        kind: EntityKind,
        id: u64,
        persisted: Version,
        incoming: Option<Version>,
    ) -> Result<()> {
        match incoming {
            Some(token) if token != persisted => {
                warn!(kind = %kind, id, persisted, token, "stale version token");
                Err(SyncError::ConflictVersionMismatch(kind, id))
            }
            _ => Ok(()),
        }
    }

    /// Re-checks every update and delete against the versions currently stored.
    pub fn validate(changes: &ChangeSet, stored: &VersionIndex) -> Result<()> {
        for (kind, id, expected) in changes.iter().filter_map(|c| c.expectation()) {
            match stored.get(&(kind, id)) {
                Some(current) if *current == expected => {}
                current => {
                    warn!(kind = %kind, id, expected, ?current, "commit lost a race");
                    return Err(SyncError::ConflictVersionMismatch(kind, id));
                }
            }
        }
        Ok(())
    }

    /// Fails when any entity was updated, inserted or removed since `baseline`
    /// was taken.
    ///
    /// Reports the smallest differing (kind, id) so the error is stable.
    pub fn unchanged_since(baseline: &VersionIndex, stored: &VersionIndex) -> Result<()> {
        let moved = stored
            .iter()
            .filter(|(key, version)| baseline.get(*key) != Some(*version))
            .map(|(key, _)| *key)
            .chain(baseline.keys().filter(|key| !stored.contains_key(*key)).copied())
            .min();
        match moved {
            Some((kind, id)) => {
                warn!(
                    kind = %kind,
                    id,
                    loaded = ?baseline.get(&(kind, id)),
                    stored = ?stored.get(&(kind, id)),
                    "tree changed since load"
                );
                Err(SyncError::ConflictVersionMismatch(kind, id))
            }
            None => Ok(()),
        }
    }

    /// Assigns ids to new entities at version 0 and bumps updated ones.
    pub fn stamp_committed(
        game: &mut Game,
        changes: &ChangeSet,
        next_id: &mut dyn FnMut() -> u64,
    ) {
        let updated = changes.updated_versions();
        game.walk_mut(&mut |kind, id, version| match id.get() {
            None => {
                *id = EntityId::Assigned(next_id());
                *version = 0;
            }
            Some(existing) => {
                if let Some(expected) = updated.get(&(kind, existing)) {
                    *version = expected + 1;
                }
            }
        });
    }

    /// Assigns ids to a freshly inserted sequence and its elements.
    pub fn stamp_sequence(sequence: &mut Sequence, next_id: &mut dyn FnMut() -> u64) {
        sequence.id = EntityId::Assigned(next_id());
        sequence.version = 0;
        for element in &mut sequence.elements {
            element.id = EntityId::Assigned(next_id());
            element.version = 0;
        }
    }
}
