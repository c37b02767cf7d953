use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::tempdir;
use wargame_sync::{
    Banner, Board, CatalogKind, EntityKind, GameService, GraphSynchronizer, MemoryStore,
    PersistenceGateway, PlayerIdentity, SyncContext, SyncError, decode_game_draft,
};

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .put_board(Board::new("Map 1", "/map/map1.png", "/map/map1-icon.png"))
        .await;
    store
        .put_board(Board::new("Map 2", "/map/map2.png", "/map/map2-icon.png"))
        .await;
    store
        .put_identity(PlayerIdentity::new("Demons", "/players/demons.png"))
        .await;
    store.put_banner(Banner::new("red", "/banners/red.png")).await;
    store
}

fn service(store: &Arc<MemoryStore>) -> GameService {
    GameService::new(SyncContext::new(store.clone(), "referee"))
}

fn unit(name: &str) -> Value {
    json!({
        "name": name, "category": "T", "type": "orc infantry", "angle": 60,
        "positionCol": 3, "positionRow": 4, "steps": 2,
        "tiredness": "F", "ammunition": "P", "cohesion": "GO", "charging": "N"
    })
}

fn new_game() -> Value {
    json!({
        "currentPlayerIndex": 0,
        "currentTurn": 1,
        "players": [{
            "identity": "Demons",
            "wings": [{
                "banner": "red",
                "units": [unit("u1"), unit("u2")],
                "retreatZone": [{"col": 0, "row": 5}]
            }]
        }],
        "map": {"boards": [{"path": "/map/map1.png", "col": 0, "row": 0, "invert": false}]},
        "locations": [{"col": 3, "row": 4, "units": ["u1", "u2"]}]
    })
}

fn game_id(wire: &Value) -> u64 {
    wire["id"].as_u64().unwrap()
}

#[tokio::test]
async fn create_assigns_ids_and_copies_snapshots() {
    let store = seeded_store().await;
    let created = service(&store).put_game(&new_game()).await.unwrap();

    assert!(game_id(&created) > 0);
    assert_eq!(created["version"], json!(0));
    let wing = &created["players"][0]["wings"][0];
    assert_eq!(wing["path"], json!("/banners/red.png"));
    assert!(wing["units"][1]["id"].as_u64().unwrap() > 0);
    assert_eq!(wing["units"][1]["version"], json!(0));
    assert_eq!(created["players"][0]["path"], json!("/players/demons.png"));
    assert_eq!(created["map"]["boards"][0]["icon"], json!("/map/map1-icon.png"));
    assert_eq!(store.game_count().await, 1);
}

#[tokio::test]
async fn identical_update_changes_nothing() {
    let store = seeded_store().await;
    let games = service(&store);
    let created = games.put_game(&new_game()).await.unwrap();

    let again = games.put_game(&created).await.unwrap();
    assert_eq!(again, created);
}

#[tokio::test]
async fn update_bumps_only_touched_versions() {
    let store = seeded_store().await;
    let games = service(&store);
    let mut wire = games.put_game(&new_game()).await.unwrap();

    wire["players"][0]["wings"][0]["units"][0]["steps"] = json!(1);
    wire["players"][0]["wings"][0]["units"][0]["cohesion"] = json!("D");
    let updated = games.put_game(&wire).await.unwrap();

    let wing = &updated["players"][0]["wings"][0];
    assert_eq!(wing["units"][0]["version"], json!(1));
    assert_eq!(wing["units"][0]["cohesion"], json!("D"));
    assert_eq!(wing["units"][1]["version"], json!(0));
    assert_eq!(wing["version"], json!(0));
    assert_eq!(updated["version"], json!(0));
}

#[tokio::test]
async fn new_members_get_ids_and_orphans_disappear() {
    let store = seeded_store().await;
    let games = service(&store);
    let mut wire = games.put_game(&new_game()).await.unwrap();
    let kept = wire["players"][0]["wings"][0]["units"][0]["id"].clone();

    wire["players"][0]["wings"][0]["units"] =
        json!([wire["players"][0]["wings"][0]["units"][0].clone(), unit("u3")]);
    wire["locations"][0]["units"] = json!(["u1", "u3"]);
    let updated = games.put_game(&wire).await.unwrap();

    let wing = &updated["players"][0]["wings"][0];
    let units = wing["units"].as_array().unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0]["id"], kept);
    assert_eq!(units[1]["name"], json!("u3"));
    assert!(units[1]["id"].as_u64().unwrap() > 0);
    assert_eq!(units[1]["version"], json!(0));
    // membership changed
    assert_eq!(wing["version"], json!(1));
    assert_eq!(updated["locations"][0]["units"], json!(["u1", "u3"]));
}

#[tokio::test]
async fn dangling_location_name_is_kept() {
    let store = seeded_store().await;
    let games = service(&store);
    let mut wire = games.put_game(&new_game()).await.unwrap();

    let units = wire["players"][0]["wings"][0]["units"].as_array_mut().unwrap();
    units.truncate(1);
    let updated = games.put_game(&wire).await.unwrap();

    assert_eq!(updated["locations"][0]["units"], json!(["u1", "u2"]));
    let units = updated["players"][0]["wings"][0]["units"].as_array().unwrap();
    assert_eq!(units.len(), 1);
}

#[tokio::test]
async fn locations_are_replaced_by_the_incoming_list() {
    let store = seeded_store().await;
    let games = service(&store);
    let mut wire = games.put_game(&new_game()).await.unwrap();
    let old_location = wire["locations"][0]["id"].clone();

    wire["locations"] = json!([{"id": 424242, "col": 9, "row": 9, "units": ["u2"]}]);
    let updated = games.put_game(&wire).await.unwrap();

    let locations = updated["locations"].as_array().unwrap();
    assert_eq!(locations.len(), 1);
    assert_ne!(locations[0]["id"], old_location);
    assert_ne!(locations[0]["id"], json!(424242));
    assert_eq!(locations[0]["version"], json!(0));
    assert_eq!(locations[0]["units"], json!(["u2"]));
    assert_eq!(updated["version"], json!(1));
}

#[tokio::test]
async fn unresolved_board_leaves_store_unchanged() {
    let store = seeded_store().await;
    let games = service(&store);
    let mut wire = games.put_game(&new_game()).await.unwrap();
    let before = games.get_game(game_id(&wire)).await.unwrap();

    wire["players"][0]["wings"][0]["units"][0]["steps"] = json!(1);
    wire["map"]["boards"] = json!([
        wire["map"]["boards"][0].clone(),
        {"path": "/map/unknown.png", "col": 1, "row": 0}
    ]);
    let err = games.put_game(&wire).await.unwrap_err();

    assert_eq!(
        err,
        SyncError::ReferenceNotFound(CatalogKind::Board, "/map/unknown.png".into())
    );
    assert_eq!(games.get_game(game_id(&wire)).await.unwrap(), before);
}

#[tokio::test]
async fn unresolved_board_on_create_stores_nothing() {
    let store = seeded_store().await;
    let mut wire = new_game();
    wire["map"]["boards"][0]["path"] = json!("/map/nowhere.png");

    let err = service(&store).put_game(&wire).await.unwrap_err();
    assert_eq!(
        err,
        SyncError::ReferenceNotFound(CatalogKind::Board, "/map/nowhere.png".into())
    );
    assert_eq!(store.game_count().await, 0);
}

#[tokio::test]
async fn catalog_edits_do_not_leak_into_games() {
    let store = seeded_store().await;
    let games = service(&store);
    let created = games.put_game(&new_game()).await.unwrap();

    store
        .put_board(Board::new("Map 1", "/map/map1.png", "/map/redrawn-icon.png"))
        .await;
    store.remove_banner("red").await;

    let stored = games.get_game(game_id(&created)).await.unwrap();
    assert_eq!(stored["map"]["boards"][0]["icon"], json!("/map/map1-icon.png"));
    assert_eq!(stored["players"][0]["wings"][0]["path"], json!("/banners/red.png"));
}

#[tokio::test]
async fn stale_unit_token_aborts_whole_update() {
    let store = seeded_store().await;
    let games = service(&store);
    let created = games.put_game(&new_game()).await.unwrap();

    let mut first = created.clone();
    first["players"][0]["wings"][0]["units"][0]["steps"] = json!(1);
    games.put_game(&first).await.unwrap();

    let mut second = created.clone();
    second["currentTurn"] = json!(2);
    second["players"][0]["wings"][0]["units"][0]["steps"] = json!(0);
    let unit_id = second["players"][0]["wings"][0]["units"][0]["id"].as_u64().unwrap();
    let err = games.put_game(&second).await.unwrap_err();

    assert_eq!(err, SyncError::ConflictVersionMismatch(EntityKind::Unit, unit_id));
    assert!(err.is_conflict());
    let stored = games.get_game(game_id(&created)).await.unwrap();
    assert_eq!(stored["currentTurn"], json!(1));
    assert_eq!(stored["players"][0]["wings"][0]["units"][0]["steps"], json!(1));
}

#[tokio::test]
async fn commit_rechecks_versions_against_store() {
    let store = seeded_store().await;
    let games = service(&store);
    let created = games.put_game(&new_game()).await.unwrap();
    let id = game_id(&created);

    // a pass computed against the tree as loaded now
    let loaded = store.load_game(id).await.unwrap().unwrap();
    let mut stale_wire = created.clone();
    stale_wire["players"][0]["wings"][0]["units"][1]["steps"] = json!(1);
    let draft = decode_game_draft(&stale_wire).unwrap();
    let resolver = wargame_sync::GatewayResolver::new(store.clone());
    let outcome = GraphSynchronizer::new(&resolver)
        .synchronize(Some(loaded), &draft)
        .await
        .unwrap();

    // another request lands first
    let mut racing = created.clone();
    racing["players"][0]["wings"][0]["units"][1]["steps"] = json!(0);
    games.put_game(&racing).await.unwrap();

    let err = store.commit_game(outcome).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::ConflictVersionMismatch(EntityKind::Unit, _)
    ));
    let stored = games.get_game(id).await.unwrap();
    assert_eq!(stored["players"][0]["wings"][0]["units"][1]["steps"], json!(0));
}

#[tokio::test]
async fn commit_rejects_tree_edited_elsewhere_since_load() {
    let store = seeded_store().await;
    let games = service(&store);
    let created = games.put_game(&new_game()).await.unwrap();
    let id = game_id(&created);

    // a pass that edits u2 only, computed against the tree as loaded now
    let loaded = store.load_game(id).await.unwrap().unwrap();
    let mut stale_wire = created.clone();
    stale_wire["players"][0]["wings"][0]["units"][1]["steps"] = json!(7);
    let draft = decode_game_draft(&stale_wire).unwrap();
    let resolver = wargame_sync::GatewayResolver::new(store.clone());
    let outcome = GraphSynchronizer::new(&resolver)
        .synchronize(Some(loaded), &draft)
        .await
        .unwrap();

    // another request edits u1 and lands first
    let mut racing = created.clone();
    racing["players"][0]["wings"][0]["units"][0]["steps"] = json!(9);
    games.put_game(&racing).await.unwrap();
    let u1 = racing["players"][0]["wings"][0]["units"][0]["id"].as_u64().unwrap();

    let err = store.commit_game(outcome).await.unwrap_err();
    assert_eq!(err, SyncError::ConflictVersionMismatch(EntityKind::Unit, u1));
    let stored = games.get_game(id).await.unwrap();
    let units = &stored["players"][0]["wings"][0]["units"];
    assert_eq!(units[0]["steps"], json!(9));
    assert_eq!(units[1]["steps"], json!(2));
}

#[tokio::test]
async fn commit_rejects_member_inserted_elsewhere_since_load() {
    let store = seeded_store().await;
    let games = service(&store);
    let created = games.put_game(&new_game()).await.unwrap();
    let id = game_id(&created);

    let loaded = store.load_game(id).await.unwrap().unwrap();
    let mut stale_wire = created.clone();
    stale_wire["currentTurn"] = json!(3);
    let draft = decode_game_draft(&stale_wire).unwrap();
    let resolver = wargame_sync::GatewayResolver::new(store.clone());
    let outcome = GraphSynchronizer::new(&resolver)
        .synchronize(Some(loaded), &draft)
        .await
        .unwrap();

    let mut racing = created.clone();
    racing["players"][0]["wings"][0]["units"]
        .as_array_mut()
        .unwrap()
        .push(unit("u3"));
    games.put_game(&racing).await.unwrap();

    let err = store.commit_game(outcome).await.unwrap_err();
    assert!(err.is_conflict());
    let stored = games.get_game(id).await.unwrap();
    assert_eq!(stored["currentTurn"], json!(1));
    assert_eq!(stored["players"][0]["wings"][0]["units"][2]["name"], json!("u3"));
}

#[tokio::test]
async fn malformed_root_id_is_reported_as_payload_error() {
    let store = seeded_store().await;
    let games = service(&store);
    for bad in [json!("7"), json!(-1)] {
        let mut wire = new_game();
        wire["id"] = bad;
        let err = games.put_game(&wire).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidPayload(ref field, _) if field == "id"));
    }
    assert_eq!(store.game_count().await, 0);
}

#[tokio::test]
async fn foreign_member_id_is_rejected() {
    let store = seeded_store().await;
    let games = service(&store);
    let mut wire = games.put_game(&new_game()).await.unwrap();

    wire["players"][0]["wings"][0]["retreatZone"][0]["id"] = json!(9999);
    let err = games.put_game(&wire).await.unwrap_err();
    assert_eq!(err, SyncError::UnknownMember(EntityKind::RetreatHex, 9999));
}

#[tokio::test]
async fn update_of_missing_game_is_not_found() {
    let store = seeded_store().await;
    let mut wire = new_game();
    wire["id"] = json!(404);
    let err = service(&store).put_game(&wire).await.unwrap_err();
    assert_eq!(err, SyncError::NotFound(EntityKind::Game, "404".into()));
}

#[tokio::test]
async fn delete_checks_version_and_cascades() {
    let store = seeded_store().await;
    let games = service(&store);
    let mut wire = games.put_game(&new_game()).await.unwrap();
    let id = game_id(&wire);
    wire["currentTurn"] = json!(2);
    games.put_game(&wire).await.unwrap();

    let err = games.delete_game(id, Some(0)).await.unwrap_err();
    assert_eq!(err, SyncError::ConflictVersionMismatch(EntityKind::Game, id));

    games.delete_game(id, Some(1)).await.unwrap();
    assert_eq!(store.game_count().await, 0);
    assert_eq!(
        games.get_game(id).await.unwrap_err(),
        SyncError::NotFound(EntityKind::Game, id.to_string())
    );
}

#[tokio::test]
async fn snapshot_file_round_trips_games() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");

    let store = seeded_store().await;
    let created = service(&store).put_game(&new_game()).await.unwrap();
    store.save(&path).await.unwrap();

    let reopened = Arc::new(MemoryStore::open(&path).await.unwrap());
    let games = service(&reopened);
    assert_eq!(games.get_game(game_id(&created)).await.unwrap(), created);

    // references still resolve after reopening
    let mut wire = created.clone();
    wire["map"]["boards"][0]["path"] = json!("/map/map2.png");
    let updated = games.put_game(&wire).await.unwrap();
    assert_eq!(updated["map"]["boards"][0]["icon"], json!("/map/map2-icon.png"));
}
