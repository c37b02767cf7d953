// ============================================================================
// Wargame Sync Library
// ============================================================================
//
// Synchronizes wargame aggregates (games with their players, wings, units,
// map and locations) against a persistence gateway, and encodes the turn
// action logs that go with them.
//
// ============================================================================

pub mod codec;
pub mod config;
pub mod core;
pub mod model;
pub mod resolve;
pub mod service;
pub mod storage;
pub mod sync;

// Re-export main types for convenience
pub use codec::{
    WireCodec, decode_element, decode_game_draft, decode_sequence, encode_element, encode_game,
    encode_sequence,
};
pub use config::ServiceConfig;
pub use core::{CatalogKind, EntityId, EntityKind, ErrorCategory, Result, SyncError, Version};
pub use model::{Banner, Board, Game, GameDraft, PlayerIdentity, Sequence, SequenceAction};
pub use resolve::{GatewayResolver, ReferenceResolver};
pub use service::{GameService, SequenceService, SyncContext};
pub use storage::{MemoryStore, PersistenceGateway};
pub use sync::{ChangeSet, GraphSynchronizer, SyncOutcome};
