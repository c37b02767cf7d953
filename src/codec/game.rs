//! Wire form of the game aggregate.
//!
//! Catalog references are denormalized: a placement carries the board's
//! `path` and `icon`, a player its identity name (`identity`) and `path`, a
//! wing its banner name (`banner`) and `path`. Incoming drafts only read the
//! natural key; the copied fields are refreshed by resolution.

use super::tables::CodeTable;
use super::{WireCodec, WireObject, stamped};
use crate::core::Result;
use crate::model::{
    BannerSnapshot, BoardPlacement, BoardSnapshot, Game, GameDraft, GameMap, IdentitySnapshot,
    Location, LocationDraft, MapDraft, PlacementDraft, Player, PlayerDraft, RetreatHex,
    RetreatHexDraft, Unit, UnitDraft, UnitState, Wing, WingDraft,
};
use serde_json::{Map, Value as JsonValue};

// ============================================================================
// Shared field groups
// ============================================================================

fn read_unit_state(obj: &WireObject<'_>) -> Result<UnitState> {
    Ok(UnitState {
        category: obj.code()?,
        troop_type: obj.string_or_default("type")?,
        angle: obj.i32_or("angle", 0)?,
        position_col: obj.i32("positionCol")?,
        position_row: obj.i32("positionRow")?,
        position_angle: obj.opt_i32("positionAngle")?,
        steps: obj.u32_or("steps", 0)?,
        tiredness: obj.code()?,
        ammunition: obj.code()?,
        cohesion: obj.code()?,
        charging: obj.code()?,
        engaging: obj.bool_or("engaging", false)?,
        contact: obj.bool_or("contact", false)?,
        order_given: obj.bool_or("orderGiven", false)?,
        played: obj.bool_or("played", false)?,
    })
}

fn write_unit_state(state: &UnitState, obj: &mut Map<String, JsonValue>) {
    obj.insert("category".into(), state.category.code().into());
    obj.insert("type".into(), state.troop_type.clone().into());
    obj.insert("angle".into(), state.angle.into());
    obj.insert("positionCol".into(), state.position_col.into());
    obj.insert("positionRow".into(), state.position_row.into());
    if let Some(angle) = state.position_angle {
        obj.insert("positionAngle".into(), angle.into());
    }
    obj.insert("steps".into(), state.steps.into());
    obj.insert("tiredness".into(), state.tiredness.code().into());
    obj.insert("ammunition".into(), state.ammunition.code().into());
    obj.insert("cohesion".into(), state.cohesion.code().into());
    obj.insert("charging".into(), state.charging.code().into());
    obj.insert("engaging".into(), state.engaging.into());
    obj.insert("contact".into(), state.contact.into());
    obj.insert("orderGiven".into(), state.order_given.into());
    obj.insert("played".into(), state.played.into());
}

fn encode_all<T: WireCodec>(items: &[T]) -> JsonValue {
    JsonValue::Array(items.iter().map(WireCodec::to_wire).collect())
}

fn decode_all<T: WireCodec>(obj: &WireObject<'_>, key: &str) -> Result<Vec<T>> {
    obj.array(key)?.iter().map(T::from_wire).collect()
}

// ============================================================================
// Persisted records
// ============================================================================

impl WireCodec for Unit {
    fn to_wire(&self) -> JsonValue {
        let mut obj = stamped(self.id, self.version);
        obj.insert("name".into(), self.name.clone().into());
        write_unit_state(&self.state, &mut obj);
        JsonValue::Object(obj)
    }

    fn from_wire(value: &JsonValue) -> Result<Self> {
        let obj = WireObject::new(value, "unit")?;
        Ok(Self {
            id: obj.id()?,
            version: obj.version()?.unwrap_or(0),
            name: obj.str("name")?.to_string(),
            state: read_unit_state(&obj)?,
        })
    }
}

impl WireCodec for RetreatHex {
    fn to_wire(&self) -> JsonValue {
        let mut obj = stamped(self.id, self.version);
        obj.insert("col".into(), self.col.into());
        obj.insert("row".into(), self.row.into());
        JsonValue::Object(obj)
    }

    fn from_wire(value: &JsonValue) -> Result<Self> {
        let obj = WireObject::new(value, "retreatZone")?;
        Ok(Self {
            id: obj.id()?,
            version: obj.version()?.unwrap_or(0),
            col: obj.i32("col")?,
            row: obj.i32("row")?,
        })
    }
}

impl WireCodec for Wing {
    fn to_wire(&self) -> JsonValue {
        let mut obj = stamped(self.id, self.version);
        obj.insert("banner".into(), self.banner.name.clone().into());
        obj.insert("path".into(), self.banner.path.clone().into());
        obj.insert("units".into(), encode_all(&self.units));
        obj.insert("retreatZone".into(), encode_all(&self.retreat_zone));
        JsonValue::Object(obj)
    }

    fn from_wire(value: &JsonValue) -> Result<Self> {
        let obj = WireObject::new(value, "wing")?;
        Ok(Self {
            id: obj.id()?,
            version: obj.version()?.unwrap_or(0),
            banner: BannerSnapshot {
                name: obj.str("banner")?.to_string(),
                path: obj.string_or_default("path")?,
            },
            units: decode_all(&obj, "units")?,
            retreat_zone: decode_all(&obj, "retreatZone")?,
        })
    }
}

impl WireCodec for Player {
    fn to_wire(&self) -> JsonValue {
        let mut obj = stamped(self.id, self.version);
        obj.insert("identity".into(), self.identity.name.clone().into());
        obj.insert("path".into(), self.identity.path.clone().into());
        obj.insert("wings".into(), encode_all(&self.wings));
        JsonValue::Object(obj)
    }

    fn from_wire(value: &JsonValue) -> Result<Self> {
        let obj = WireObject::new(value, "player")?;
        Ok(Self {
            id: obj.id()?,
            version: obj.version()?.unwrap_or(0),
            identity: IdentitySnapshot {
                name: obj.str("identity")?.to_string(),
                path: obj.string_or_default("path")?,
            },
            wings: decode_all(&obj, "wings")?,
        })
    }
}

impl WireCodec for BoardPlacement {
    fn to_wire(&self) -> JsonValue {
        let mut obj = stamped(self.id, self.version);
        obj.insert("path".into(), self.board.path.clone().into());
        obj.insert("icon".into(), self.board.icon.clone().into());
        obj.insert("col".into(), self.col.into());
        obj.insert("row".into(), self.row.into());
        obj.insert("invert".into(), self.invert.into());
        JsonValue::Object(obj)
    }

    fn from_wire(value: &JsonValue) -> Result<Self> {
        let obj = WireObject::new(value, "boards")?;
        Ok(Self {
            id: obj.id()?,
            version: obj.version()?.unwrap_or(0),
            board: BoardSnapshot {
                path: obj.str("path")?.to_string(),
                icon: obj.string_or_default("icon")?,
            },
            col: obj.i32("col")?,
            row: obj.i32("row")?,
            invert: obj.bool_or("invert", false)?,
        })
    }
}

impl WireCodec for GameMap {
    fn to_wire(&self) -> JsonValue {
        let mut obj = stamped(self.id, self.version);
        obj.insert("boards".into(), encode_all(&self.placements));
        JsonValue::Object(obj)
    }

    fn from_wire(value: &JsonValue) -> Result<Self> {
        let obj = WireObject::new(value, "map")?;
        Ok(Self {
            id: obj.id()?,
            version: obj.version()?.unwrap_or(0),
            placements: decode_all(&obj, "boards")?,
        })
    }
}

impl WireCodec for Location {
    fn to_wire(&self) -> JsonValue {
        let mut obj = stamped(self.id, self.version);
        obj.insert("col".into(), self.col.into());
        obj.insert("row".into(), self.row.into());
        obj.insert(
            "units".into(),
            JsonValue::Array(self.units.iter().cloned().map(JsonValue::from).collect()),
        );
        JsonValue::Object(obj)
    }

    fn from_wire(value: &JsonValue) -> Result<Self> {
        let obj = WireObject::new(value, "location")?;
        Ok(Self {
            id: obj.id()?,
            version: obj.version()?.unwrap_or(0),
            col: obj.i32("col")?,
            row: obj.i32("row")?,
            units: obj.strings("units")?,
        })
    }
}

impl WireCodec for Game {
    fn to_wire(&self) -> JsonValue {
        let mut obj = stamped(self.id, self.version);
        obj.insert("currentPlayerIndex".into(), self.current_player_index.into());
        obj.insert("currentTurn".into(), self.current_turn.into());
        obj.insert("players".into(), encode_all(&self.players));
        obj.insert("map".into(), self.map.to_wire());
        obj.insert("locations".into(), encode_all(&self.locations));
        JsonValue::Object(obj)
    }

    fn from_wire(value: &JsonValue) -> Result<Self> {
        let obj = WireObject::new(value, "game")?;
        let map = match value.get("map") {
            Some(JsonValue::Null) | None => GameMap::default(),
            Some(map) => GameMap::from_wire(map)?,
        };
        Ok(Self {
            id: obj.id()?,
            version: obj.version()?.unwrap_or(0),
            current_player_index: obj.u32_or("currentPlayerIndex", 0)?,
            current_turn: obj.u32_or("currentTurn", 0)?,
            players: decode_all(&obj, "players")?,
            map,
            locations: decode_all(&obj, "locations")?,
        })
    }
}

pub fn encode_game(game: &Game) -> JsonValue {
    game.to_wire()
}

// ============================================================================
// Incoming drafts
// ============================================================================

fn unit_draft(obj: &WireObject<'_>) -> Result<UnitDraft> {
    Ok(UnitDraft {
        id: obj.id()?,
        version: obj.version()?,
        name: obj.str("name")?.to_string(),
        state: read_unit_state(obj)?,
    })
}

fn retreat_hex_draft(obj: &WireObject<'_>) -> Result<RetreatHexDraft> {
    Ok(RetreatHexDraft {
        id: obj.id()?,
        version: obj.version()?,
        col: obj.i32("col")?,
        row: obj.i32("row")?,
    })
}

fn wing_draft(obj: &WireObject<'_>) -> Result<WingDraft> {
    Ok(WingDraft {
        id: obj.id()?,
        version: obj.version()?,
        banner: obj.str("banner")?.to_string(),
        units: each(obj, "units", unit_draft)?,
        retreat_zone: each(obj, "retreatZone", retreat_hex_draft)?,
    })
}

fn player_draft(obj: &WireObject<'_>) -> Result<PlayerDraft> {
    Ok(PlayerDraft {
        id: obj.id()?,
        version: obj.version()?,
        identity: obj.str("identity")?.to_string(),
        wings: each(obj, "wings", wing_draft)?,
    })
}

fn placement_draft(obj: &WireObject<'_>) -> Result<PlacementDraft> {
    Ok(PlacementDraft {
        id: obj.id()?,
        version: obj.version()?,
        path: obj.str("path")?.to_string(),
        col: obj.i32("col")?,
        row: obj.i32("row")?,
        invert: obj.bool_or("invert", false)?,
    })
}

fn location_draft(obj: &WireObject<'_>) -> Result<LocationDraft> {
    Ok(LocationDraft {
        id: obj.id()?,
        version: obj.version()?,
        col: obj.i32("col")?,
        row: obj.i32("row")?,
        units: obj.strings("units")?,
    })
}

fn each<'a, T>(
    obj: &WireObject<'a>,
    key: &str,
    decode: fn(&WireObject<'a>) -> Result<T>,
) -> Result<Vec<T>> {
    obj.objects(key)?.iter().map(decode).collect()
}

/// Decodes an incoming game into a candidate tree for synchronization.
pub fn decode_game_draft(value: &JsonValue) -> Result<GameDraft> {
    let obj = WireObject::new(value, "game")?;
    let map = match obj.opt_object("map")? {
        Some(map) => MapDraft {
            id: map.id()?,
            version: map.version()?,
            placements: each(&map, "boards", placement_draft)?,
        },
        None => MapDraft::default(),
    };
    Ok(GameDraft {
        id: obj.id()?,
        version: obj.version()?,
        current_player_index: obj.u32_or("currentPlayerIndex", 0)?,
        current_turn: obj.u32_or("currentTurn", 0)?,
        players: each(&obj, "players", player_draft)?,
        map,
        locations: each(&obj, "locations", location_draft)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityId, SyncError};
    use crate::model::{Ammunition, Charging, Cohesion, Tiredness, UnitCategory};
    use serde_json::json;

    fn sample_game() -> Game {
        Game {
            id: EntityId::Assigned(1),
            version: 3,
            current_player_index: 1,
            current_turn: 4,
            players: vec![Player {
                id: EntityId::Assigned(2),
                version: 1,
                identity: IdentitySnapshot {
                    name: "Demons".into(),
                    path: "/players/demons.png".into(),
                },
                wings: vec![Wing {
                    id: EntityId::Assigned(3),
                    version: 0,
                    banner: BannerSnapshot {
                        name: "red".into(),
                        path: "/banners/red.png".into(),
                    },
                    units: vec![Unit {
                        id: EntityId::Assigned(4),
                        version: 2,
                        name: "u1".into(),
                        state: UnitState {
                            category: UnitCategory::Formation,
                            troop_type: "orc infantry".into(),
                            angle: 60,
                            position_col: 5,
                            position_row: 8,
                            position_angle: Some(90),
                            steps: 4,
                            tiredness: Tiredness::Tired,
                            ammunition: Ammunition::Scarce,
                            cohesion: Cohesion::Disrupted,
                            charging: Charging::CanCharge,
                            engaging: true,
                            contact: true,
                            order_given: false,
                            played: true,
                        },
                    }],
                    retreat_zone: vec![RetreatHex {
                        id: EntityId::Assigned(5),
                        version: 0,
                        col: 1,
                        row: 2,
                    }],
                }],
            }],
            map: GameMap {
                id: EntityId::Assigned(6),
                version: 0,
                placements: vec![BoardPlacement {
                    id: EntityId::Assigned(7),
                    version: 0,
                    board: BoardSnapshot {
                        path: "/map/map1.png".into(),
                        icon: "/map/map1-icon.png".into(),
                    },
                    col: 0,
                    row: 0,
                    invert: true,
                }],
            },
            locations: vec![Location {
                id: EntityId::Assigned(8),
                version: 0,
                col: 5,
                row: 8,
                units: vec!["u1".into()],
            }],
        }
    }

    #[test]
    fn test_game_round_trip() {
        let game = sample_game();
        let decoded = Game::from_wire(&game.to_wire()).unwrap();
        assert_eq!(decoded, game);
    }

    #[test]
    fn test_transient_entities_round_trip() {
        let mut game = sample_game();
        game.walk_mut(&mut |_, id, version| {
            *id = EntityId::Unassigned;
            *version = 0;
        });
        let wire = game.to_wire();
        assert_eq!(wire["id"], json!(0));
        assert_eq!(Game::from_wire(&wire).unwrap(), game);
    }

    #[test]
    fn test_snapshot_fields_are_inline() {
        let wire = sample_game().to_wire();
        let placement = &wire["map"]["boards"][0];
        assert_eq!(placement["path"], json!("/map/map1.png"));
        assert_eq!(placement["icon"], json!("/map/map1-icon.png"));
        assert!(placement.get("board").is_none());
        assert_eq!(wire["players"][0]["identity"], json!("Demons"));
        assert_eq!(wire["players"][0]["wings"][0]["banner"], json!("red"));
        assert_eq!(wire["locations"][0]["units"], json!(["u1"]));
    }

    #[test]
    fn test_draft_keeps_version_presence() {
        let value = json!({
            "players": [{
                "id": 2, "version": 1, "identity": "Demons",
                "wings": [{"banner": "red", "units": [], "retreatZone": [{"col": 1, "row": 1}]}]
            }],
            "map": {"boards": [{"path": "/map/map1.png", "col": 0, "row": 0}]}
        });
        let draft = decode_game_draft(&value).unwrap();
        assert_eq!(draft.id, EntityId::Unassigned);
        assert_eq!(draft.version, None);
        assert_eq!(draft.players[0].version, Some(1));
        assert_eq!(draft.players[0].wings[0].version, None);
        assert_eq!(draft.players[0].wings[0].retreat_zone.len(), 1);
        assert!(!draft.map.placements[0].invert);
    }

    #[test]
    fn test_unknown_tiredness_code() {
        let value = json!({
            "players": [{"identity": "Demons", "wings": [{"banner": "red", "units": [{
                "name": "u1", "category": "T", "positionCol": 1, "positionRow": 1,
                "tiredness": "Q", "ammunition": "P", "cohesion": "GO", "charging": "N"
            }]}]}]
        });
        let err = decode_game_draft(&value).unwrap_err();
        assert_eq!(err, SyncError::UnknownEnumCode("tiredness".into(), "Q".into()));
    }

    #[test]
    fn test_missing_natural_key() {
        let value = json!({"players": [{"wings": []}]});
        let err = decode_game_draft(&value).unwrap_err();
        assert!(matches!(err, SyncError::InvalidPayload(field, _) if field == "identity"));
    }
}
