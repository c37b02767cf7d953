//! JSON snapshot file for [`MemoryStore`].
//!
//! Aggregates and action logs are written in their wire form, so a snapshot
//! can be read back with the same codec the service speaks. The file is
//! replaced through a temporary sibling and a rename.

use super::memory::{MemoryStore, Tables};
use crate::codec::WireCodec;
use crate::core::{EntityId, Result, SyncError, Version};
use crate::model::{Banner, Board, Game, PlayerIdentity, Sequence};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;
use tokio::fs;
use tracing::info;

pub const SNAPSHOT_FORMAT_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub format_version: u16,
    pub created_at: DateTime<Utc>,
    pub game_count: usize,
    pub sequence_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    metadata: SnapshotMetadata,
    last_id: u64,
    games: Vec<JsonValue>,
    sequences: Vec<JsonValue>,
    boards: Vec<BoardRow>,
    identities: Vec<NamedRow>,
    banners: Vec<NamedRow>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BoardRow {
    id: u64,
    version: Version,
    name: String,
    path: String,
    icon: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct NamedRow {
    id: u64,
    version: Version,
    name: String,
    path: String,
}

impl From<&Board> for BoardRow {
    fn from(board: &Board) -> Self {
        Self {
            id: board.id.to_wire(),
            version: board.version,
            name: board.name.clone(),
            path: board.path.clone(),
            icon: board.icon.clone(),
        }
    }
}

impl From<BoardRow> for Board {
    fn from(row: BoardRow) -> Self {
        Self {
            id: EntityId::from_wire(row.id),
            version: row.version,
            name: row.name,
            path: row.path,
            icon: row.icon,
        }
    }
}

impl NamedRow {
    fn new(id: EntityId, version: Version, name: &str, path: &str) -> Self {
        Self {
            id: id.to_wire(),
            version,
            name: name.to_string(),
            path: path.to_string(),
        }
    }
}

impl StoreFile {
    fn capture(tables: &Tables) -> Self {
        let mut games: Vec<&Game> = tables.games.values().collect();
        games.sort_by_key(|game| game.id.to_wire());
        let mut boards: Vec<&Board> = tables.boards.values().collect();
        boards.sort_by(|a, b| a.path.cmp(&b.path));
        let mut identities: Vec<&PlayerIdentity> = tables.identities.values().collect();
        identities.sort_by(|a, b| a.name.cmp(&b.name));
        let mut banners: Vec<&Banner> = tables.banners.values().collect();
        banners.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            metadata: SnapshotMetadata {
                format_version: SNAPSHOT_FORMAT_VERSION,
                created_at: Utc::now(),
                game_count: games.len(),
                sequence_count: tables.sequences.len(),
            },
            last_id: tables.last_id,
            games: games.into_iter().map(WireCodec::to_wire).collect(),
            sequences: tables.sequences.values().map(WireCodec::to_wire).collect(),
            boards: boards.into_iter().map(BoardRow::from).collect(),
            identities: identities
                .into_iter()
                .map(|i| NamedRow::new(i.id, i.version, &i.name, &i.path))
                .collect(),
            banners: banners
                .into_iter()
                .map(|b| NamedRow::new(b.id, b.version, &b.name, &b.path))
                .collect(),
        }
    }

    fn restore(self) -> Result<Tables> {
        if self.metadata.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SyncError::unexpected(format!(
                "unsupported snapshot format version {}",
                self.metadata.format_version
            )));
        }

        let mut tables = Tables {
            last_id: self.last_id,
            ..Tables::default()
        };
        for wire in &self.games {
            let game = Game::from_wire(wire)?;
            let id = game
                .id
                .get()
                .ok_or_else(|| SyncError::unexpected("snapshot holds a game without an id"))?;
            tables.games.insert(id, game);
        }
        for wire in &self.sequences {
            let sequence = Sequence::from_wire(wire)?;
            tables.sequences.insert(sequence.key(), sequence);
        }
        for row in self.boards {
            let board = Board::from(row);
            tables.boards.insert(board.path.clone(), board);
        }
        for row in self.identities {
            let identity = PlayerIdentity {
                id: EntityId::from_wire(row.id),
                version: row.version,
                name: row.name,
                path: row.path,
            };
            tables.identities.insert(identity.name.clone(), identity);
        }
        for row in self.banners {
            let banner = Banner {
                id: EntityId::from_wire(row.id),
                version: row.version,
                name: row.name,
                path: row.path,
            };
            tables.banners.insert(banner.name.clone(), banner);
        }
        Ok(tables)
    }
}

impl MemoryStore {
    /// Opens a store from a snapshot file; a missing file yields an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no snapshot found, starting empty");
            return Ok(Self::new());
        }

        let bytes = fs::read(path).await?;
        let file: StoreFile = serde_json::from_slice(&bytes).map_err(|err| {
            SyncError::unexpected(format!("parse snapshot {}: {err}", path.display()))
        })?;
        let metadata = file.metadata.clone();
        let tables = file.restore()?;
        info!(
            path = %path.display(),
            games = metadata.game_count,
            sequences = metadata.sequence_count,
            created_at = %metadata.created_at,
            "snapshot loaded"
        );
        Ok(Self::from_tables(tables))
    }

    /// Writes the whole store to `path`, replacing any previous snapshot.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<SnapshotMetadata> {
        let path = path.as_ref();
        let file = {
            let tables = self.tables.read().await;
            StoreFile::capture(&tables)
        };
        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|err| SyncError::unexpected(format!("serialize snapshot: {err}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, bytes).await?;
        fs::rename(&tmp_path, path).await?;

        info!(path = %path.display(), games = file.metadata.game_count, "snapshot saved");
        Ok(file.metadata)
    }
}
