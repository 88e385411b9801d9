#![allow(dead_code)]

use chrono::{DateTime, SubsecRound, Utc};
use fauna_database::Database;
use fauna_domain::config::SpawnsConfig;
use fauna_spawns::model::{Branch, Habitat, ReferenceData, Species};
use fauna_spawns::repository::Repositories;
use fauna_spawns::store::{MemoryStore, SqliteStore};
use fauna_spawns::{MIGRATIONS, SpawnService};
use std::sync::Arc;
use tempfile::TempDir;

pub fn branch(id: &str, latitude: f64, longitude: f64, capacity: u32) -> Branch {
    Branch { id: id.into(), longitude, latitude, capacity, habitat_id: Some("forest".into()) }
}

pub fn species(id: &str) -> Species {
    Species { id: id.into(), name: id.to_uppercase(), description: String::new(), habitat_id: Some("forest".into()) }
}

pub fn reference(branches: Vec<Branch>, species_ids: &[&str]) -> ReferenceData {
    ReferenceData {
        habitats: vec![Habitat { id: "forest".into(), name: "Forest".into(), description: String::new() }],
        species: species_ids.iter().copied().map(species).collect(),
        branches,
    }
}

pub fn memory_service(data: &ReferenceData) -> (Arc<MemoryStore>, SpawnService) {
    let store = Arc::new(MemoryStore::with_reference(data));
    let service = SpawnService::new(Repositories::shared(store.clone()), &SpawnsConfig::default())
        .expect("service");
    (store, service)
}

/// File backed so several pool connections really compete for the write lock.
pub async fn sqlite_service(data: &ReferenceData) -> (TempDir, Arc<SqliteStore>, SpawnService) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("spawns.db").display());
    let db = Database::builder().url(url).migrations(MIGRATIONS).init().await.expect("database");

    let store = Arc::new(SqliteStore::new(db));
    let service = SpawnService::new(Repositories::shared(store.clone()), &SpawnsConfig::default())
        .expect("service");
    service.import(data).await.expect("import");
    (dir, store, service)
}

/// Current time at the millisecond resolution the stores keep.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
