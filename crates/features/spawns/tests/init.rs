use fauna_database::Database;
use fauna_domain::config::ApiConfig;
use fauna_spawns::{MIGRATIONS, SpawnError, Spawns, init};
use std::any::TypeId;

async fn database() -> Database {
    Database::builder().url("sqlite::memory:").migrations(MIGRATIONS).init().await.expect("database")
}

#[tokio::test]
async fn init_imports_seed_fixture() {
    let mut config = ApiConfig::default();
    config.spawns.seed_file = Some(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/seed.json").into());
    let db = database().await;

    let slice = init(&config, db.clone()).await.expect("init");
    assert_eq!(slice.id, TypeId::of::<Spawns>());
    assert_eq!(slice.name(), "Spawns");

    let branches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM branch").fetch_one(db.pool()).await.unwrap();
    assert_eq!(branches, 4);

    // Importing twice keeps one row per id.
    init(&config, db.clone()).await.expect("second init");
    let species: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM species").fetch_one(db.pool()).await.unwrap();
    assert_eq!(species, 6);
}

#[tokio::test]
async fn init_rejects_inverted_ttl_window() {
    let mut config = ApiConfig::default();
    config.spawns.min_ttl_ms = 10_000;
    config.spawns.max_ttl_ms = 1_000;

    let err = init(&config, database().await).await.unwrap_err();
    assert!(matches!(err, SpawnError::Config { .. }));
}
