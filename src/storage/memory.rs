use super::PersistenceGateway;
use crate::core::{CatalogKind, EntityId, EntityKind, Result, SyncError, Version};
use crate::model::{Banner, Board, CatalogEntry, Game, PlayerIdentity, Sequence};
use crate::sync::{ConcurrencyGuard, SyncOutcome};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Table contents, swapped as a unit under the store's write lock.
#[derive(Debug, Default, Clone)]
pub(super) struct Tables {
    pub(super) games: HashMap<u64, Game>,
    pub(super) sequences: BTreeMap<(u64, u32), Sequence>,
    /// Boards keyed by path
    pub(super) boards: HashMap<String, Board>,
    /// Player identities keyed by name
    pub(super) identities: HashMap<String, PlayerIdentity>,
    /// Banners keyed by name
    pub(super) banners: HashMap<String, Banner>,
    /// Last id handed out, shared by every entity kind
    pub(super) last_id: u64,
}

impl Tables {
    pub(super) fn allocate(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

/// In-memory gateway. All tables sit behind one lock so a commit is atomic.
pub struct MemoryStore {
    pub(super) tables: RwLock<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    pub(super) fn from_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Insert a board, or replace the one with the same path
    pub async fn put_board(&self, mut board: Board) -> Board {
        let mut tables = self.tables.write().await;
        let previous = tables.boards.get(&board.path).map(|b| (b.id, b.version));
        stamp_catalog(&mut tables, previous, &mut board.id, &mut board.version);
        tables.boards.insert(board.path.clone(), board.clone());
        debug!(path = %board.path, version = board.version, "board stored");
        board
    }

    /// Insert a player identity, or replace the one with the same name
    pub async fn put_identity(&self, mut identity: PlayerIdentity) -> PlayerIdentity {
        let mut tables = self.tables.write().await;
        let previous = tables.identities.get(&identity.name).map(|i| (i.id, i.version));
        stamp_catalog(&mut tables, previous, &mut identity.id, &mut identity.version);
        tables.identities.insert(identity.name.clone(), identity.clone());
        debug!(name = %identity.name, version = identity.version, "player identity stored");
        identity
    }

    /// Insert a banner, or replace the one with the same name
    pub async fn put_banner(&self, mut banner: Banner) -> Banner {
        let mut tables = self.tables.write().await;
        let previous = tables.banners.get(&banner.name).map(|b| (b.id, b.version));
        stamp_catalog(&mut tables, previous, &mut banner.id, &mut banner.version);
        tables.banners.insert(banner.name.clone(), banner.clone());
        debug!(name = %banner.name, version = banner.version, "banner stored");
        banner
    }

    pub async fn remove_board(&self, path: &str) -> Option<Board> {
        self.tables.write().await.boards.remove(path)
    }

    pub async fn remove_identity(&self, name: &str) -> Option<PlayerIdentity> {
        self.tables.write().await.identities.remove(name)
    }

    pub async fn remove_banner(&self, name: &str) -> Option<Banner> {
        self.tables.write().await.banners.remove(name)
    }

    /// Catalog rows of one kind, ordered by natural key
    pub async fn catalog(&self, kind: CatalogKind) -> Vec<CatalogEntry> {
        let tables = self.tables.read().await;
        let mut rows: Vec<CatalogEntry> = match kind {
            CatalogKind::Board => tables.boards.values().cloned().map(CatalogEntry::Board).collect(),
            CatalogKind::PlayerIdentity => tables
                .identities
                .values()
                .cloned()
                .map(CatalogEntry::PlayerIdentity)
                .collect(),
            CatalogKind::Banner => tables.banners.values().cloned().map(CatalogEntry::Banner).collect(),
        };
        rows.sort_by(|a, b| a.natural_key().cmp(b.natural_key()));
        rows
    }

    pub async fn game_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.tables.read().await.games.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn game_count(&self) -> usize {
        self.tables.read().await.games.len()
    }

    pub async fn sequence_count(&self) -> usize {
        self.tables.read().await.sequences.len()
    }
}

/// Keeps the id of a replaced catalog row and bumps its version.
fn stamp_catalog(
    tables: &mut Tables,
    previous: Option<(EntityId, Version)>,
    id: &mut EntityId,
    version: &mut Version,
) {
    match previous {
        Some((existing, stored)) => {
            *id = existing;
            *version = stored + 1;
        }
        None => {
            *id = EntityId::Assigned(tables.allocate());
            *version = 0;
        }
    }
}

#[async_trait]
impl PersistenceGateway for MemoryStore {
    async fn load_game(&self, id: u64) -> Result<Option<Game>> {
        Ok(self.tables.read().await.games.get(&id).cloned())
    }

    async fn load_sequence(&self, game: u64, count: u32) -> Result<Option<Sequence>> {
        Ok(self.tables.read().await.sequences.get(&(game, count)).cloned())
    }

    async fn list_sequences(&self, game: u64) -> Result<Vec<Sequence>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sequences
            .range((game, u32::MIN)..=(game, u32::MAX))
            .map(|(_, sequence)| sequence.clone())
            .collect())
    }

    async fn lookup_catalog(&self, kind: CatalogKind, key: &str) -> Result<Option<CatalogEntry>> {
        let tables = self.tables.read().await;
        let entry = match kind {
            CatalogKind::Board => tables.boards.get(key).cloned().map(CatalogEntry::Board),
            CatalogKind::PlayerIdentity => tables
                .identities
                .get(key)
                .cloned()
                .map(CatalogEntry::PlayerIdentity),
            CatalogKind::Banner => tables.banners.get(key).cloned().map(CatalogEntry::Banner),
        };
        Ok(entry)
    }

    async fn commit_game(&self, outcome: SyncOutcome) -> Result<Game> {
        let SyncOutcome {
            mut game,
            changes,
            baseline,
        } = outcome;
        let mut tables = self.tables.write().await;

        let stored = match game.id.get() {
            Some(id) => {
                let current = tables.games.get(&id).ok_or_else(|| {
                    SyncError::unexpected(format!("game {id} disappeared before commit"))
                })?;
                current.version_index()
            }
            None => HashMap::new(),
        };
        ConcurrencyGuard::validate(&changes, &stored)?;
        ConcurrencyGuard::unchanged_since(&baseline, &stored)?;
        if changes.is_empty() {
            return Ok(game);
        }

        ConcurrencyGuard::stamp_committed(&mut game, &changes, &mut || tables.allocate());
        let id = game.id.to_wire();
        tables.games.insert(id, game.clone());
        info!(
            game_id = id,
            version = game.version,
            inserts = changes.inserts(),
            updates = changes.updates(),
            deletes = changes.deletes(),
            "game committed"
        );
        Ok(game)
    }

    async fn delete_game(&self, id: u64, expected_version: Option<Version>) -> Result<Game> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .games
            .get(&id)
            .ok_or_else(|| SyncError::NotFound(EntityKind::Game, id.to_string()))?;
        ConcurrencyGuard::check(EntityKind::Game, id, stored.version, expected_version)?;
        let removed = tables
            .games
            .remove(&id)
            .ok_or_else(|| SyncError::unexpected(format!("game {id} vanished under lock")))?;
        info!(game_id = id, entities = removed.entity_count(), "game deleted");
        Ok(removed)
    }

    async fn insert_sequence(&self, mut sequence: Sequence) -> Result<Sequence> {
        let mut tables = self.tables.write().await;
        let key = sequence.key();
        if tables.sequences.contains_key(&key) {
            return Err(SyncError::DuplicateSequence(key.0, key.1));
        }
        ConcurrencyGuard::stamp_sequence(&mut sequence, &mut || tables.allocate());
        tables.sequences.insert(key, sequence.clone());
        info!(
            game_id = key.0,
            count = key.1,
            elements = sequence.elements.len(),
            "sequence inserted"
        );
        Ok(sequence)
    }

    async fn delete_sequence(
        &self,
        game: u64,
        count: u32,
        expected_version: Option<Version>,
    ) -> Result<Sequence> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .sequences
            .get(&(game, count))
            .ok_or_else(|| SyncError::NotFound(EntityKind::Sequence, format!("{game}/{count}")))?;
        let id = stored.id.to_wire();
        ConcurrencyGuard::check(EntityKind::Sequence, id, stored.version, expected_version)?;
        let removed = tables.sequences.remove(&(game, count)).ok_or_else(|| {
            SyncError::unexpected(format!("sequence {game}/{count} vanished under lock"))
        })?;
        info!(game_id = game, count, "sequence deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SequenceAction, SequenceElement};
    use crate::sync::ChangeSet;

    fn sequence(game: u64, count: u32) -> Sequence {
        Sequence {
            id: EntityId::Unassigned,
            version: 0,
            game,
            count,
            elements: vec![SequenceElement::new(SequenceAction::NextTurn)],
        }
    }

    #[tokio::test]
    async fn test_put_board_replaces_by_path() {
        let store = MemoryStore::new();
        let first = store.put_board(Board::new("Map 1", "/map/map1.png", "/icon-a.png")).await;
        let second = store.put_board(Board::new("Map 1", "/map/map1.png", "/icon-b.png")).await;
        assert_eq!(first.id, second.id);
        assert_eq!(second.version, 1);

        let entry = store
            .lookup_catalog(CatalogKind::Board, "/map/map1.png")
            .await
            .unwrap();
        assert!(matches!(entry, Some(CatalogEntry::Board(b)) if b.icon == "/icon-b.png"));
        assert_eq!(store.catalog(CatalogKind::Board).await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_catalog_rows() {
        let store = MemoryStore::new();
        store.put_banner(Banner::new("red", "/banners/red.png")).await;
        assert!(store.remove_banner("red").await.is_some());
        assert!(store.remove_banner("red").await.is_none());
        assert!(
            store
                .lookup_catalog(CatalogKind::Banner, "red")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sequences_are_unique_and_ordered() {
        let store = MemoryStore::new();
        store.insert_sequence(sequence(1, 2)).await.unwrap();
        store.insert_sequence(sequence(1, 1)).await.unwrap();
        store.insert_sequence(sequence(2, 1)).await.unwrap();

        let err = store.insert_sequence(sequence(1, 2)).await.unwrap_err();
        assert_eq!(err, SyncError::DuplicateSequence(1, 2));

        let counts: Vec<u32> = store
            .list_sequences(1)
            .await
            .unwrap()
            .iter()
            .map(|s| s.count)
            .collect();
        assert_eq!(counts, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_inserted_sequence_gets_ids() {
        let store = MemoryStore::new();
        let stored = store.insert_sequence(sequence(1, 1)).await.unwrap();
        assert!(stored.id.is_assigned());
        assert!(stored.elements.iter().all(|e| e.id.is_assigned()));
        assert_ne!(stored.id, stored.elements[0].id);
    }

    #[tokio::test]
    async fn test_delete_sequence_checks_version() {
        let store = MemoryStore::new();
        let stored = store.insert_sequence(sequence(1, 1)).await.unwrap();
        let err = store.delete_sequence(1, 1, Some(3)).await.unwrap_err();
        assert_eq!(
            err,
            SyncError::ConflictVersionMismatch(EntityKind::Sequence, stored.id.to_wire())
        );
        store.delete_sequence(1, 1, Some(0)).await.unwrap();
        assert_eq!(
            store.delete_sequence(1, 1, None).await.unwrap_err(),
            SyncError::NotFound(EntityKind::Sequence, "1/1".into())
        );
    }

    #[tokio::test]
    async fn test_commit_of_vanished_game_is_unexpected() {
        let store = MemoryStore::new();
        let game = Game {
            id: EntityId::Assigned(5),
            ..Game::default()
        };
        let mut changes = ChangeSet::new();
        changes.update(EntityKind::Game, 5, 0);
        let baseline = game.version_index();
        let outcome = SyncOutcome {
            game,
            changes,
            baseline,
        };
        let err = store.commit_game(outcome).await.unwrap_err();
        assert!(matches!(err, SyncError::UnexpectedPersistenceFailure(_)));
        assert_eq!(store.game_count().await, 0);
    }
}
