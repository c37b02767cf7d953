// ============================================================================
// Reference Resolution
// ============================================================================
//
// Catalog rows (boards, player identities, banners) are addressed by natural
// key. Resolution returns a value snapshot, never a handle on the live row,
// so later catalog edits cannot leak into synchronized aggregates.
//
// ============================================================================

use crate::core::{CatalogKind, Result, SyncError};
use crate::model::{BannerSnapshot, BoardSnapshot, CatalogSnapshot, IdentitySnapshot};
use crate::storage::PersistenceGateway;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    /// Resolves `key` in the `kind` catalog.
    ///
    /// Fails with `ReferenceNotFound(kind, key)` carrying `key` exactly as
    /// the caller supplied it.
    async fn resolve(&self, kind: CatalogKind, key: &str) -> Result<CatalogSnapshot>;
}

/// Resolver backed by the persistence gateway's natural-key lookup.
#[derive(Clone)]
pub struct GatewayResolver {
    gateway: Arc<dyn PersistenceGateway>,
}

impl GatewayResolver {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ReferenceResolver for GatewayResolver {
    async fn resolve(&self, kind: CatalogKind, key: &str) -> Result<CatalogSnapshot> {
        let entry = self
            .gateway
            .lookup_catalog(kind, key)
            .await?
            .ok_or_else(|| SyncError::ReferenceNotFound(kind, key.to_string()))?;
        if entry.kind() != kind {
            return Err(SyncError::unexpected(format!(
                "lookup for {kind} '{key}' returned a {} row",
                entry.kind()
            )));
        }
        Ok(entry.snapshot())
    }
}

/// Memoizing view over a resolver for the duration of one pass.
///
/// Dropped when the pass ends, so snapshots never outlive the request that
/// took them.
pub struct PassResolver<'r> {
    inner: &'r dyn ReferenceResolver,
    cache: HashMap<(CatalogKind, String), CatalogSnapshot>,
    lookups: usize,
}

impl<'r> PassResolver<'r> {
    pub fn new(inner: &'r dyn ReferenceResolver) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
            lookups: 0,
        }
    }

    pub async fn resolve(&mut self, kind: CatalogKind, key: &str) -> Result<CatalogSnapshot> {
        if let Some(hit) = self.cache.get(&(kind, key.to_string())) {
            return Ok(hit.clone());
        }
        let snapshot = self.inner.resolve(kind, key).await?;
        self.lookups += 1;
        debug!(kind = %kind, key, "resolved catalog reference");
        self.cache.insert((kind, key.to_string()), snapshot.clone());
        Ok(snapshot)
    }

    pub async fn board(&mut self, path: &str) -> Result<BoardSnapshot> {
        match self.resolve(CatalogKind::Board, path).await? {
            CatalogSnapshot::Board(board) => Ok(board),
            other => Err(mismatch(CatalogKind::Board, &other)),
        }
    }

    pub async fn identity(&mut self, name: &str) -> Result<IdentitySnapshot> {
        match self.resolve(CatalogKind::PlayerIdentity, name).await? {
            CatalogSnapshot::PlayerIdentity(identity) => Ok(identity),
            other => Err(mismatch(CatalogKind::PlayerIdentity, &other)),
        }
    }

    pub async fn banner(&mut self, name: &str) -> Result<BannerSnapshot> {
        match self.resolve(CatalogKind::Banner, name).await? {
            CatalogSnapshot::Banner(banner) => Ok(banner),
            other => Err(mismatch(CatalogKind::Banner, &other)),
        }
    }

    /// Number of lookups that reached the underlying resolver.
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}

fn mismatch(expected: CatalogKind, got: &CatalogSnapshot) -> SyncError {
    SyncError::unexpected(format!("expected a {expected} snapshot, got {got:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Banner, Board, PlayerIdentity};
    use crate::storage::MemoryStore;

    async fn store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .put_board(Board::new("Map 1", "/map/map1.png", "/map/map1-icon.png"))
            .await;
        store
            .put_identity(PlayerIdentity::new("Demons", "/players/demons.png"))
            .await;
        store.put_banner(Banner::new("red", "/banners/red.png")).await;
        store
    }

    #[tokio::test]
    async fn test_resolves_each_catalog() {
        let resolver = GatewayResolver::new(store().await);
        let mut pass = PassResolver::new(&resolver);
        assert_eq!(pass.board("/map/map1.png").await.unwrap().icon, "/map/map1-icon.png");
        assert_eq!(pass.identity("Demons").await.unwrap().path, "/players/demons.png");
        assert_eq!(pass.banner("red").await.unwrap().path, "/banners/red.png");
    }

    #[tokio::test]
    async fn test_not_found_reports_key_verbatim() {
        let resolver = GatewayResolver::new(store().await);
        let err = resolver
            .resolve(CatalogKind::Board, " /MAP/map1.png")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SyncError::ReferenceNotFound(CatalogKind::Board, " /MAP/map1.png".into())
        );
    }

    #[tokio::test]
    async fn test_pass_cache_hits_once() {
        let resolver = GatewayResolver::new(store().await);
        let mut pass = PassResolver::new(&resolver);
        for _ in 0..3 {
            pass.banner("red").await.unwrap();
        }
        assert_eq!(pass.lookups(), 1);
    }
}
