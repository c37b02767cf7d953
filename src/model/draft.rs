//! Candidate trees decoded from an incoming request.
//!
//! A draft mirrors the aggregate but carries natural keys where the
//! aggregate carries snapshots, and an optional version token where the
//! aggregate carries the persisted version.

use super::game::UnitState;
use crate::core::{EntityId, EntityKind, Version};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDraft {
    pub id: EntityId,
    pub version: Option<Version>,
    pub name: String,
    pub state: UnitState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetreatHexDraft {
    pub id: EntityId,
    pub version: Option<Version>,
    pub col: i32,
    pub row: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WingDraft {
    pub id: EntityId,
    pub version: Option<Version>,
    /// Banner natural key (name).
    pub banner: String,
    pub units: Vec<UnitDraft>,
    pub retreat_zone: Vec<RetreatHexDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerDraft {
    pub id: EntityId,
    pub version: Option<Version>,
    /// Player identity natural key (name).
    pub identity: String,
    pub wings: Vec<WingDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementDraft {
    pub id: EntityId,
    pub version: Option<Version>,
    /// Board natural key (path).
    pub path: String,
    pub col: i32,
    pub row: i32,
    pub invert: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapDraft {
    pub id: EntityId,
    pub version: Option<Version>,
    pub placements: Vec<PlacementDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationDraft {
    pub id: EntityId,
    pub version: Option<Version>,
    pub col: i32,
    pub row: i32,
    pub units: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameDraft {
    pub id: EntityId,
    pub version: Option<Version>,
    pub current_player_index: u32,
    pub current_turn: u32,
    pub players: Vec<PlayerDraft>,
    pub map: MapDraft,
    pub locations: Vec<LocationDraft>,
}

/// Identity fields shared by every draft.
pub trait Candidate {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    fn version(&self) -> Option<Version>;
}

macro_rules! impl_candidate {
    ($($draft:ty => $kind:ident),+ $(,)?) => {
        $(
            impl Candidate for $draft {
                const KIND: EntityKind = EntityKind::$kind;

                fn id(&self) -> EntityId {
                    self.id
                }

                fn version(&self) -> Option<Version> {
                    self.version
                }
            }
        )+
    };
}

impl_candidate! {
    GameDraft => Game,
    PlayerDraft => Player,
    WingDraft => Wing,
    UnitDraft => Unit,
    RetreatHexDraft => RetreatHex,
    MapDraft => Map,
    PlacementDraft => BoardPlacement,
    LocationDraft => Location,
}
