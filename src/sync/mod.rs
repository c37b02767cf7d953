// ============================================================================
// Graph Synchronization
// ============================================================================
//
// Reconciles a candidate tree with the persisted aggregate, one owned
// collection at a time:
//
//   Game.players → Player.wings → Wing.units
//                               └ Wing.retreatZone
//   Game.map     → Map.boards
//   Game.locations (rebuilt from the candidate list on every pass)
//
// The pass mutates an owned copy of the persisted tree and records a change
// set. Nothing reaches the gateway until the whole pass has succeeded.
//
// ============================================================================

pub mod changes;
pub(crate) mod collection;
pub mod guard;

pub use changes::{Change, ChangeSet};
pub use guard::ConcurrencyGuard;

use crate::core::{EntityId, EntityKind, Result, SyncError, Version};
use crate::model::{
    BoardPlacement, Entity, Game, GameDraft, GameMap, Location, LocationDraft, MapDraft,
    PlacementDraft, Player, PlayerDraft, RetreatHex, RetreatHexDraft, Unit, UnitDraft,
    VersionIndex, Wing, WingDraft,
};
use crate::resolve::{PassResolver, ReferenceResolver};
use collection::CollectionPlan;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Merged tree plus the writes needed to persist it.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub game: Game,
    pub changes: ChangeSet,
    /// Versions of the tree as loaded, before the pass touched it
    pub baseline: VersionIndex,
}

impl SyncOutcome {
    /// True when the candidate was value-identical to the persisted tree.
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

pub struct GraphSynchronizer<'r> {
    pass: PassResolver<'r>,
    changes: ChangeSet,
}

impl<'r> GraphSynchronizer<'r> {
    pub fn new(resolver: &'r dyn ReferenceResolver) -> Self {
        Self {
            pass: PassResolver::new(resolver),
            changes: ChangeSet::new(),
        }
    }

    /// Merges `draft` into `existing`, or into a fresh game when `existing`
    /// is `None`.
    pub async fn synchronize(
        mut self,
        existing: Option<Game>,
        draft: &GameDraft,
    ) -> Result<SyncOutcome> {
        let baseline = existing
            .as_ref()
            .map(Game::version_index)
            .unwrap_or_default();
        match self.run(existing, draft).await {
            Ok(game) => {
                debug!(
                    inserts = self.changes.inserts(),
                    updates = self.changes.updates(),
                    deletes = self.changes.deletes(),
                    lookups = self.pass.lookups(),
                    "synchronization pass finished"
                );
                Ok(SyncOutcome {
                    game,
                    changes: self.changes,
                    baseline,
                })
            }
            Err(err) => {
                warn!(error = %err, "synchronization aborted");
                Err(err)
            }
        }
    }

    async fn run(&mut self, existing: Option<Game>, draft: &GameDraft) -> Result<Game> {
        let root = match (existing, draft.id.get()) {
            (Some(game), Some(id)) if game.id.get() != Some(id) => {
                return Err(SyncError::UnknownMember(EntityKind::Game, id));
            }
            (Some(game), _) => game,
            (None, Some(id)) => return Err(SyncError::NotFound(EntityKind::Game, id.to_string())),
            (None, None) => Game::new(),
        };
        let game = self.merge_game(root, draft).await?;
        log_dangling_units(&game);
        Ok(game)
    }

    /// Records an insert for a new entity, or an update for a touched one.
    fn settle<E: Entity>(&mut self, entity: &E, token: Option<Version>, touched: bool) -> Result<()> {
        match entity.id().get() {
            None => self.changes.insert(E::KIND),
            Some(id) if touched => {
                ConcurrencyGuard::check(E::KIND, id, entity.version(), token)?;
                self.changes.update(E::KIND, id, entity.version());
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Schedules every orphan and its owned subtree for deletion.
    fn drop_orphans<E: Entity>(&mut self, orphans: &[E]) {
        let changes = &mut self.changes;
        for orphan in orphans {
            orphan.walk(&mut |header| {
                if let Some(id) = header.id.get() {
                    changes.delete(header.kind, id, header.version);
                }
            });
        }
    }

    async fn merge_game(&mut self, mut game: Game, draft: &GameDraft) -> Result<Game> {
        let mut touched = game.current_player_index != draft.current_player_index
            || game.current_turn != draft.current_turn;
        game.current_player_index = draft.current_player_index;
        game.current_turn = draft.current_turn;

        let plan = CollectionPlan::build(std::mem::take(&mut game.players), &draft.players)?;
        touched |= plan.membership_changed();
        let (members, orphans) = plan.into_parts();
        self.drop_orphans(&orphans);
        for (player, candidate) in members {
            let merged = self.merge_player(player, candidate).await?;
            game.players.push(merged);
        }

        let map = std::mem::take(&mut game.map);
        game.map = self.merge_map(map, &draft.map).await?;

        let old = std::mem::take(&mut game.locations);
        touched |= self.replace_locations(&mut game, old, &draft.locations)?;

        self.settle(&game, draft.version, touched)?;
        Ok(game)
    }

    async fn merge_player(&mut self, mut player: Player, draft: &PlayerDraft) -> Result<Player> {
        let identity = self.pass.identity(&draft.identity).await?;
        let mut touched = player.identity != identity;
        player.identity = identity;

        let plan = CollectionPlan::build(std::mem::take(&mut player.wings), &draft.wings)?;
        touched |= plan.membership_changed();
        let (members, orphans) = plan.into_parts();
        self.drop_orphans(&orphans);
        for (wing, candidate) in members {
            let merged = self.merge_wing(wing, candidate).await?;
            player.wings.push(merged);
        }

        self.settle(&player, draft.version, touched)?;
        Ok(player)
    }

    async fn merge_wing(&mut self, mut wing: Wing, draft: &WingDraft) -> Result<Wing> {
        let banner = self.pass.banner(&draft.banner).await?;
        let mut touched = wing.banner != banner;
        wing.banner = banner;

        let plan = CollectionPlan::build(std::mem::take(&mut wing.units), &draft.units)?;
        touched |= plan.membership_changed();
        let (members, orphans) = plan.into_parts();
        self.drop_orphans(&orphans);
        for (unit, candidate) in members {
            let merged = self.merge_unit(unit, candidate)?;
            wing.units.push(merged);
        }

        let plan = CollectionPlan::build(std::mem::take(&mut wing.retreat_zone), &draft.retreat_zone)?;
        touched |= plan.membership_changed();
        let (members, orphans) = plan.into_parts();
        self.drop_orphans(&orphans);
        for (hex, candidate) in members {
            let merged = self.merge_retreat_hex(hex, candidate)?;
            wing.retreat_zone.push(merged);
        }

        self.settle(&wing, draft.version, touched)?;
        Ok(wing)
    }

    fn merge_unit(&mut self, mut unit: Unit, draft: &UnitDraft) -> Result<Unit> {
        let touched = unit.name != draft.name || unit.state != draft.state;
        unit.name.clone_from(&draft.name);
        unit.state = draft.state.clone();
        self.settle(&unit, draft.version, touched)?;
        Ok(unit)
    }

    fn merge_retreat_hex(&mut self, mut hex: RetreatHex, draft: &RetreatHexDraft) -> Result<RetreatHex> {
        let touched = (hex.col, hex.row) != (draft.col, draft.row);
        hex.col = draft.col;
        hex.row = draft.row;
        self.settle(&hex, draft.version, touched)?;
        Ok(hex)
    }

    async fn merge_map(&mut self, mut map: GameMap, draft: &MapDraft) -> Result<GameMap> {
        if let Some(id) = draft.id.get() {
            if map.id.get() != Some(id) {
                return Err(SyncError::UnknownMember(EntityKind::Map, id));
            }
        }

        let plan = CollectionPlan::build(std::mem::take(&mut map.placements), &draft.placements)?;
        let touched = plan.membership_changed();
        let (members, orphans) = plan.into_parts();
        self.drop_orphans(&orphans);
        for (placement, candidate) in members {
            let merged = self.merge_placement(placement, candidate).await?;
            map.placements.push(merged);
        }

        self.settle(&map, draft.version, touched)?;
        Ok(map)
    }

    async fn merge_placement(
        &mut self,
        mut placement: BoardPlacement,
        draft: &PlacementDraft,
    ) -> Result<BoardPlacement> {
        let board = self.pass.board(&draft.path).await?;
        let touched = placement.board != board
            || (placement.col, placement.row, placement.invert)
                != (draft.col, draft.row, draft.invert);
        placement.board = board;
        placement.col = draft.col;
        placement.row = draft.row;
        placement.invert = draft.invert;
        self.settle(&placement, draft.version, touched)?;
        Ok(placement)
    }

    /// Rebuilds the location list in candidate order.
    ///
    /// A candidate whose id names a persisted location keeps that row. Any
    /// other candidate becomes a new row, whatever id it carries. Persisted
    /// rows left unclaimed are deleted. Returns whether the list itself
    /// changed.
    fn replace_locations(
        &mut self,
        game: &mut Game,
        old: Vec<Location>,
        drafts: &[LocationDraft],
    ) -> Result<bool> {
        let before: Vec<EntityId> = old.iter().map(|location| location.id).collect();
        let mut persisted: HashMap<u64, Location> = old
            .into_iter()
            .filter_map(|location| location.id.get().map(|id| (id, location)))
            .collect();

        for candidate in drafts {
            let location = match candidate.id.get().and_then(|id| persisted.remove(&id)) {
                Some(location) => self.merge_location(location, candidate)?,
                None => self.create_location(candidate),
            };
            game.locations.push(location);
        }

        let mut leftover: Vec<Location> = persisted.into_values().collect();
        leftover.sort_by_key(|location| location.id.to_wire());
        self.drop_orphans(&leftover);

        let after: Vec<EntityId> = game.locations.iter().map(|location| location.id).collect();
        Ok(before != after)
    }

    fn create_location(&mut self, draft: &LocationDraft) -> Location {
        self.changes.insert(EntityKind::Location);
        Location {
            col: draft.col,
            row: draft.row,
            units: draft.units.clone(),
            ..Location::default()
        }
    }

    fn merge_location(&mut self, mut location: Location, draft: &LocationDraft) -> Result<Location> {
        let touched = (location.col, location.row) != (draft.col, draft.row)
            || location.units != draft.units;
        location.col = draft.col;
        location.row = draft.row;
        location.units.clone_from(&draft.units);
        self.settle(&location, draft.version, touched)?;
        Ok(location)
    }
}

/// Location unit names are weak links; one naming no unit is kept as given.
fn log_dangling_units(game: &Game) {
    let index = game.unit_index();
    for location in &game.locations {
        for name in location.units.iter().filter(|name| !index.contains(name)) {
            debug!(col = location.col, row = location.row, unit = %name, "location names no unit");
        }
    }
}
