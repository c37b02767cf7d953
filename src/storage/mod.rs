pub mod memory;
pub mod snapshot;

pub use memory::MemoryStore;
pub use snapshot::{SNAPSHOT_FORMAT_VERSION, SnapshotMetadata};

use crate::core::{CatalogKind, Result, Version};
use crate::model::{CatalogEntry, Game, Sequence};
use crate::sync::SyncOutcome;
use async_trait::async_trait;

/// Persistence collaborator - supplies loads, natural-key lookups and the
/// transactional boundary for commits.
///
/// Every mutating method is all-or-nothing: on error the store is exactly as
/// it was before the call.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Load a whole game aggregate by root id
    async fn load_game(&self, id: u64) -> Result<Option<Game>>;

    /// Load the action log of one turn
    async fn load_sequence(&self, game: u64, count: u32) -> Result<Option<Sequence>>;

    /// All action logs of a game, ordered by count
    async fn list_sequences(&self, game: u64) -> Result<Vec<Sequence>>;

    /// Load a catalog row by natural key
    async fn lookup_catalog(&self, kind: CatalogKind, key: &str) -> Result<Option<CatalogEntry>>;

    /// Apply a synchronized tree and return it with ids and versions stamped.
    ///
    /// Rejected with a version conflict when the stored tree no longer
    /// matches the outcome's baseline.
    async fn commit_game(&self, outcome: SyncOutcome) -> Result<Game>;

    /// Delete a game and everything it owns
    async fn delete_game(&self, id: u64, expected_version: Option<Version>) -> Result<Game>;

    /// Insert a new action log; (game, count) must be unused
    async fn insert_sequence(&self, sequence: Sequence) -> Result<Sequence>;

    /// Delete one action log
    async fn delete_sequence(
        &self,
        game: u64,
        count: u32,
        expected_version: Option<Version>,
    ) -> Result<Sequence>;
}
