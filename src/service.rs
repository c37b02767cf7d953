// ============================================================================
// Services
// ============================================================================
//
// Request-level entry points. Each call decodes the wire payload, runs one
// synchronization pass or one sequence operation, commits through the
// gateway and returns the re-encoded result.
//
// ============================================================================

use crate::codec::{WireCodec, decode_game_draft, decode_sequence, encode_game, encode_sequence};
use crate::core::{EntityKind, Result, SyncError, Version};
use crate::model::{Game, GameDraft};
use crate::resolve::{GatewayResolver, ReferenceResolver};
use crate::storage::PersistenceGateway;
use crate::sync::GraphSynchronizer;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};

/// Collaborators of one request: where references resolve, where writes go,
/// and who is acting.
#[derive(Clone)]
pub struct SyncContext {
    resolver: Arc<dyn ReferenceResolver>,
    gateway: Arc<dyn PersistenceGateway>,
    principal: String,
}

impl SyncContext {
    /// Context whose references resolve against the gateway's catalogs.
    pub fn new(gateway: Arc<dyn PersistenceGateway>, principal: impl Into<String>) -> Self {
        Self {
            resolver: Arc::new(GatewayResolver::new(gateway.clone())),
            gateway,
            principal: principal.into(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn resolver(&self) -> &dyn ReferenceResolver {
        self.resolver.as_ref()
    }

    pub fn gateway(&self) -> &dyn PersistenceGateway {
        self.gateway.as_ref()
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }
}

#[derive(Clone)]
pub struct GameService {
    ctx: SyncContext,
}

impl GameService {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    /// Creates the game when the payload has no id, updates it otherwise.
    pub async fn put_game(&self, wire: &JsonValue) -> Result<JsonValue> {
        let draft = decode_game_draft(wire)?;
        match draft.id.get() {
            None => self.create(&draft).await,
            Some(id) => self.update(id, &draft).await,
        }
    }

    pub async fn create_game(&self, wire: &JsonValue) -> Result<JsonValue> {
        let draft = decode_game_draft(wire)?;
        if let Some(id) = draft.id.get() {
            return Err(SyncError::invalid("id", format!("a new game cannot carry id {id}")));
        }
        self.create(&draft).await
    }

    pub async fn update_game(&self, id: u64, wire: &JsonValue) -> Result<JsonValue> {
        self.update(id, &decode_game_draft(wire)?).await
    }

    async fn create(&self, draft: &GameDraft) -> Result<JsonValue> {
        let outcome = GraphSynchronizer::new(self.ctx.resolver())
            .synchronize(None, draft)
            .await?;
        let game = self.ctx.gateway().commit_game(outcome).await?;
        info!(
            principal = %self.ctx.principal(),
            game_id = game.id.to_wire(),
            entities = game.entity_count(),
            "game created"
        );
        Ok(encode_game(&game))
    }

    async fn update(&self, id: u64, draft: &GameDraft) -> Result<JsonValue> {
        let existing = self.load(id).await?;
        let outcome = GraphSynchronizer::new(self.ctx.resolver())
            .synchronize(Some(existing), draft)
            .await?;
        if outcome.is_noop() {
            info!(principal = %self.ctx.principal(), game_id = id, "game unchanged");
            return Ok(encode_game(&outcome.game));
        }

        let changes = outcome.changes.clone();
        let game = match self.ctx.gateway().commit_game(outcome).await {
            Ok(game) => game,
            Err(err) => {
                warn!(principal = %self.ctx.principal(), game_id = id, error = %err, "commit rejected");
                return Err(err);
            }
        };
        info!(
            principal = %self.ctx.principal(),
            game_id = id,
            version = game.version,
            inserts = changes.inserts(),
            updates = changes.updates(),
            deletes = changes.deletes(),
            "game updated"
        );
        Ok(encode_game(&game))
    }

    pub async fn get_game(&self, id: u64) -> Result<JsonValue> {
        Ok(encode_game(&self.load(id).await?))
    }

    pub async fn delete_game(&self, id: u64, expected_version: Option<Version>) -> Result<()> {
        let removed = self.ctx.gateway().delete_game(id, expected_version).await?;
        info!(
            principal = %self.ctx.principal(),
            game_id = id,
            entities = removed.entity_count(),
            "game removed"
        );
        Ok(())
    }

    async fn load(&self, id: u64) -> Result<Game> {
        self.ctx
            .gateway()
            .load_game(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(EntityKind::Game, id.to_string()))
    }
}

#[derive(Clone)]
pub struct SequenceService {
    ctx: SyncContext,
}

impl SequenceService {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn create_sequence(&self, wire: &JsonValue) -> Result<JsonValue> {
        let sequence = decode_sequence(wire)?;
        let stored = self.ctx.gateway().insert_sequence(sequence).await?;
        info!(
            principal = %self.ctx.principal(),
            game_id = stored.game,
            count = stored.count,
            units = stored.acting_units().len(),
            "sequence recorded"
        );
        Ok(encode_sequence(&stored))
    }

    pub async fn get_sequence(&self, game: u64, count: u32) -> Result<JsonValue> {
        let sequence = self
            .ctx
            .gateway()
            .load_sequence(game, count)
            .await?
            .ok_or_else(|| SyncError::NotFound(EntityKind::Sequence, format!("{game}/{count}")))?;
        Ok(encode_sequence(&sequence))
    }

    pub async fn list_sequences(&self, game: u64) -> Result<JsonValue> {
        let sequences = self.ctx.gateway().list_sequences(game).await?;
        Ok(JsonValue::Array(
            sequences.iter().map(WireCodec::to_wire).collect(),
        ))
    }

    pub async fn delete_sequence(
        &self,
        game: u64,
        count: u32,
        expected_version: Option<Version>,
    ) -> Result<()> {
        self.ctx
            .gateway()
            .delete_sequence(game, count, expected_version)
            .await?;
        info!(principal = %self.ctx.principal(), game_id = game, count, "sequence removed");
        Ok(())
    }
}
