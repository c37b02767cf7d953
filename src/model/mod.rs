pub mod catalog;
pub mod draft;
pub mod enums;
pub mod game;
pub mod sequence;

pub use catalog::{
    Banner, BannerSnapshot, Board, BoardSnapshot, CatalogEntry, CatalogSnapshot,
    IdentitySnapshot, PlayerIdentity,
};
pub use draft::{
    Candidate, GameDraft, LocationDraft, MapDraft, PlacementDraft, PlayerDraft, RetreatHexDraft,
    UnitDraft, WingDraft,
};
pub use enums::{Ammunition, Charging, Cohesion, Stacking, Tiredness, UnitCategory};
pub use game::{
    BoardPlacement, Entity, EntityHeader, Game, GameMap, Location, Player, RetreatHex, Unit, UnitIndex,
    UnitState, VersionIndex, Wing,
};
pub use sequence::{ElementState, HexTarget, Sequence, SequenceAction, SequenceElement};
