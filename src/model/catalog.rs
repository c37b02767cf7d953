//! Catalog entities and the value snapshots copied out of them.
//!
//! Catalog rows live outside any game aggregate and are addressed by natural
//! key. Aggregates never hold them live: synchronization copies the fields it
//! needs into a snapshot stored inline in the owning record.

use crate::core::{CatalogKind, EntityId, Version};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub id: EntityId,
    pub version: Version,
    pub name: String,
    /// Natural key.
    pub path: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub id: EntityId,
    pub version: Version,
    /// Natural key.
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub id: EntityId,
    pub version: Version,
    /// Natural key.
    pub name: String,
    pub path: String,
}

impl Board {
    pub fn new(name: impl Into<String>, path: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id: EntityId::Unassigned,
            version: 0,
            name: name.into(),
            path: path.into(),
            icon: icon.into(),
        }
    }
}

impl PlayerIdentity {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: EntityId::Unassigned,
            version: 0,
            name: name.into(),
            path: path.into(),
        }
    }
}

impl Banner {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: EntityId::Unassigned,
            version: 0,
            name: name.into(),
            path: path.into(),
        }
    }
}

/// A catalog row of any kind, as returned by a natural-key lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    Board(Board),
    PlayerIdentity(PlayerIdentity),
    Banner(Banner),
}

impl CatalogEntry {
    pub fn kind(&self) -> CatalogKind {
        match self {
            Self::Board(_) => CatalogKind::Board,
            Self::PlayerIdentity(_) => CatalogKind::PlayerIdentity,
            Self::Banner(_) => CatalogKind::Banner,
        }
    }

    pub fn natural_key(&self) -> &str {
        match self {
            Self::Board(board) => &board.path,
            Self::PlayerIdentity(identity) => &identity.name,
            Self::Banner(banner) => &banner.name,
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            Self::Board(board) => board.id,
            Self::PlayerIdentity(identity) => identity.id,
            Self::Banner(banner) => banner.id,
        }
    }

    /// Copies the denormalized fields out of this row.
    pub fn snapshot(&self) -> CatalogSnapshot {
        match self {
            Self::Board(board) => CatalogSnapshot::Board(BoardSnapshot::from(board)),
            Self::PlayerIdentity(identity) => {
                CatalogSnapshot::PlayerIdentity(IdentitySnapshot::from(identity))
            }
            Self::Banner(banner) => CatalogSnapshot::Banner(BannerSnapshot::from(banner)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoardSnapshot {
    pub path: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentitySnapshot {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BannerSnapshot {
    pub name: String,
    pub path: String,
}

impl From<&Board> for BoardSnapshot {
    fn from(board: &Board) -> Self {
        Self {
            path: board.path.clone(),
            icon: board.icon.clone(),
        }
    }
}

impl From<&PlayerIdentity> for IdentitySnapshot {
    fn from(identity: &PlayerIdentity) -> Self {
        Self {
            name: identity.name.clone(),
            path: identity.path.clone(),
        }
    }
}

impl From<&Banner> for BannerSnapshot {
    fn from(banner: &Banner) -> Self {
        Self {
            name: banner.name.clone(),
            path: banner.path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSnapshot {
    Board(BoardSnapshot),
    PlayerIdentity(IdentitySnapshot),
    Banner(BannerSnapshot),
}
