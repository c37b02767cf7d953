use std::fmt;

/// Identity of a persisted entity.
///
/// On the wire an id of `0` (or no id at all) means the entity has not been
/// persisted yet; in memory that case is `Unassigned` so a real id is never
/// confused with the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityId {
    #[default]
    Unassigned,
    Assigned(u64),
}

impl EntityId {
    pub fn from_wire(raw: u64) -> Self {
        if raw == 0 {
            Self::Unassigned
        } else {
            Self::Assigned(raw)
        }
    }

    pub fn to_wire(self) -> u64 {
        match self {
            Self::Unassigned => 0,
            Self::Assigned(id) => id,
        }
    }

    pub fn get(self) -> Option<u64> {
        match self {
            Self::Unassigned => None,
            Self::Assigned(id) => Some(id),
        }
    }

    pub fn is_assigned(self) -> bool {
        matches!(self, Self::Assigned(_))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unassigned => write!(f, "unassigned"),
            Self::Assigned(id) => write!(f, "{id}"),
        }
    }
}

/// Optimistic lock token carried by every persisted entity.
pub type Version = u64;

/// Entity kinds stored by the gateway, used in errors and change sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Game,
    Player,
    Wing,
    Unit,
    RetreatHex,
    Map,
    BoardPlacement,
    Location,
    Sequence,
    SequenceElement,
}

impl EntityKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Game => "Game",
            Self::Player => "Player",
            Self::Wing => "Wing",
            Self::Unit => "Unit",
            Self::RetreatHex => "RetreatHex",
            Self::Map => "Map",
            Self::BoardPlacement => "BoardPlacement",
            Self::Location => "Location",
            Self::Sequence => "Sequence",
            Self::SequenceElement => "SequenceElement",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Catalog entities addressed by natural key rather than id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CatalogKind {
    Board,
    PlayerIdentity,
    Banner,
}

impl CatalogKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Board => "Board",
            Self::PlayerIdentity => "PlayerIdentity",
            Self::Banner => "Banner",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
