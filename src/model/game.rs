// ============================================================================
// Game Aggregate
// ============================================================================
//
// Game owns players, the map and locations with a single lifetime:
//
//   Game ─┬─ Player* ── Wing* ─┬─ Unit*
//         │                    └─ RetreatHex*
//         ├─ GameMap ── BoardPlacement*
//         └─ Location*  (weak unit names, no ownership)
//
// ============================================================================

use super::catalog::{BannerSnapshot, BoardSnapshot, IdentitySnapshot};
use super::enums::{Ammunition, Charging, Cohesion, Tiredness, UnitCategory};
use crate::core::{EntityId, EntityKind, Version};
use std::collections::HashMap;

/// Version of every persisted entity of one tree, keyed by kind and id.
pub type VersionIndex = HashMap<(EntityKind, u64), Version>;

/// Scalar and enum state of a unit. Synchronization replaces it as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitState {
    pub category: UnitCategory,
    /// Troop type name, e.g. "orc infantry".
    pub troop_type: String,
    pub angle: i32,
    pub position_col: i32,
    pub position_row: i32,
    /// Only set for units spanning two hexes.
    pub position_angle: Option<i32>,
    pub steps: u32,
    pub tiredness: Tiredness,
    pub ammunition: Ammunition,
    pub cohesion: Cohesion,
    pub charging: Charging,
    pub engaging: bool,
    pub contact: bool,
    pub order_given: bool,
    pub played: bool,
}

impl Default for UnitState {
    fn default() -> Self {
        Self {
            category: UnitCategory::Troop,
            troop_type: String::new(),
            angle: 0,
            position_col: 0,
            position_row: 0,
            position_angle: None,
            steps: 0,
            tiredness: Tiredness::Fresh,
            ammunition: Ammunition::Plentiful,
            cohesion: Cohesion::GoodOrder,
            charging: Charging::None,
            engaging: false,
            contact: false,
            order_given: false,
            played: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Unit {
    pub id: EntityId,
    pub version: Version,
    pub name: String,
    pub state: UnitState,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RetreatHex {
    pub id: EntityId,
    pub version: Version,
    pub col: i32,
    pub row: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Wing {
    pub id: EntityId,
    pub version: Version,
    pub banner: BannerSnapshot,
    pub units: Vec<Unit>,
    pub retreat_zone: Vec<RetreatHex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Player {
    pub id: EntityId,
    pub version: Version,
    pub identity: IdentitySnapshot,
    pub wings: Vec<Wing>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoardPlacement {
    pub id: EntityId,
    pub version: Version,
    pub board: BoardSnapshot,
    pub col: i32,
    pub row: i32,
    pub invert: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameMap {
    pub id: EntityId,
    pub version: Version,
    pub placements: Vec<BoardPlacement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub id: EntityId,
    pub version: Version,
    pub col: i32,
    pub row: i32,
    /// Weak references to unit names anywhere in the aggregate.
    pub units: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Game {
    pub id: EntityId,
    pub version: Version,
    pub current_player_index: u32,
    pub current_turn: u32,
    pub players: Vec<Player>,
    pub map: GameMap,
    pub locations: Vec<Location>,
}

/// Identity of one entity inside an aggregate, as seen by a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityHeader {
    pub kind: EntityKind,
    pub id: EntityId,
    pub version: Version,
}

impl Game {
    pub fn new() -> Self {
        Self::default()
    }

    /// Units in aggregate order: players, then wings, then units.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.players
            .iter()
            .flat_map(|player| player.wings.iter())
            .flat_map(|wing| wing.units.iter())
    }

    /// Builds the name lookup used to follow location references.
    pub fn unit_index(&self) -> UnitIndex<'_> {
        UnitIndex::build(self)
    }

    /// Mutable pre-order walk over the id and version of every entity.
    pub fn walk_mut(&mut self, visit: &mut dyn FnMut(EntityKind, &mut EntityId, &mut Version)) {
        visit(EntityKind::Game, &mut self.id, &mut self.version);
        for player in &mut self.players {
            visit(EntityKind::Player, &mut player.id, &mut player.version);
            for wing in &mut player.wings {
                visit(EntityKind::Wing, &mut wing.id, &mut wing.version);
                for unit in &mut wing.units {
                    visit(EntityKind::Unit, &mut unit.id, &mut unit.version);
                }
                for hex in &mut wing.retreat_zone {
                    visit(EntityKind::RetreatHex, &mut hex.id, &mut hex.version);
                }
            }
        }
        visit(EntityKind::Map, &mut self.map.id, &mut self.map.version);
        for placement in &mut self.map.placements {
            visit(EntityKind::BoardPlacement, &mut placement.id, &mut placement.version);
        }
        for location in &mut self.locations {
            visit(EntityKind::Location, &mut location.id, &mut location.version);
        }
    }

    /// Versions of every persisted entity, keyed by kind and id.
    pub fn version_index(&self) -> VersionIndex {
        let mut index = HashMap::new();
        self.walk(&mut |header| {
            if let Some(id) = header.id.get() {
                index.insert((header.kind, id), header.version);
            }
        });
        index
    }

    pub fn entity_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }
}

/// Identity shared by every entity of the aggregate.
pub trait Entity {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    fn version(&self) -> Version;

    fn header(&self) -> EntityHeader {
        EntityHeader {
            kind: Self::KIND,
            id: self.id(),
            version: self.version(),
        }
    }

    /// Visits this entity, then its owned subtree, in pre-order.
    fn walk(&self, visit: &mut dyn FnMut(EntityHeader)) {
        visit(self.header());
    }
}

macro_rules! entity_identity {
    ($kind:ident) => {
        const KIND: EntityKind = EntityKind::$kind;

        fn id(&self) -> EntityId {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }
    };
}

impl Entity for Unit {
    entity_identity!(Unit);
}

impl Entity for RetreatHex {
    entity_identity!(RetreatHex);
}

impl Entity for BoardPlacement {
    entity_identity!(BoardPlacement);
}

impl Entity for Location {
    entity_identity!(Location);
}

impl Entity for Wing {
    entity_identity!(Wing);

    fn walk(&self, visit: &mut dyn FnMut(EntityHeader)) {
        visit(self.header());
        for unit in &self.units {
            unit.walk(visit);
        }
        for hex in &self.retreat_zone {
            hex.walk(visit);
        }
    }
}

impl Entity for Player {
    entity_identity!(Player);

    fn walk(&self, visit: &mut dyn FnMut(EntityHeader)) {
        visit(self.header());
        for wing in &self.wings {
            wing.walk(visit);
        }
    }
}

impl Entity for GameMap {
    entity_identity!(Map);

    fn walk(&self, visit: &mut dyn FnMut(EntityHeader)) {
        visit(self.header());
        for placement in &self.placements {
            placement.walk(visit);
        }
    }
}

impl Entity for Game {
    entity_identity!(Game);

    fn walk(&self, visit: &mut dyn FnMut(EntityHeader)) {
        visit(self.header());
        for player in &self.players {
            player.walk(visit);
        }
        self.map.walk(visit);
        for location in &self.locations {
            location.walk(visit);
        }
    }
}

/// Post-synchronization lookup table from unit name to unit.
///
/// Unit names are not guaranteed unique inside a game; the first unit in
/// aggregate order wins.
#[derive(Debug)]
pub struct UnitIndex<'a> {
    by_name: HashMap<&'a str, &'a Unit>,
}

impl<'a> UnitIndex<'a> {
    fn build(game: &'a Game) -> Self {
        let mut by_name = HashMap::new();
        for unit in game.units() {
            by_name.entry(unit.name.as_str()).or_insert(unit);
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&'a Unit> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: u64, name: &str, steps: u32) -> Unit {
        Unit {
            id: EntityId::Assigned(id),
            version: 0,
            name: name.to_string(),
            state: UnitState {
                steps,
                ..UnitState::default()
            },
        }
    }

    fn game_with_units(units: Vec<Unit>) -> Game {
        Game {
            id: EntityId::Assigned(1),
            players: vec![Player {
                id: EntityId::Assigned(2),
                version: 0,
                identity: IdentitySnapshot::default(),
                wings: vec![Wing {
                    id: EntityId::Assigned(3),
                    version: 0,
                    banner: BannerSnapshot::default(),
                    units,
                    retreat_zone: vec![],
                }],
            }],
            ..Game::default()
        }
    }

    #[test]
    fn test_unit_index_first_match_wins() {
        let game = game_with_units(vec![unit(10, "u1", 2), unit(11, "u1", 1), unit(12, "u2", 1)]);
        let index = game.unit_index();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("u1").map(|u| u.id), Some(EntityId::Assigned(10)));
        assert!(index.contains("u2"));
        assert!(index.get("u3").is_none());
    }

    #[test]
    fn test_walk_is_pre_order() {
        let game = game_with_units(vec![unit(10, "u1", 2)]);
        let mut kinds = Vec::new();
        game.walk(&mut |header| kinds.push(header.kind));
        assert_eq!(
            kinds,
            vec![
                EntityKind::Game,
                EntityKind::Player,
                EntityKind::Wing,
                EntityKind::Unit,
                EntityKind::Map,
            ]
        );
    }

    #[test]
    fn test_version_index_skips_unassigned() {
        let game = game_with_units(vec![unit(10, "u1", 2)]);
        let index = game.version_index();
        assert_eq!(index.len(), 4);
        assert!(index.contains_key(&(EntityKind::Unit, 10)));
    }
}
