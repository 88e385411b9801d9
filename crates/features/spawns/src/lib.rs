//! Spawn pool feature slice.
//!
//! Branches are fixed places on the map. Each holds up to `capacity` live spawns
//! drawn from the species catalog; a read of an under-capacity branch tops it up
//! with spawns that expire after a random lifetime. Players claim live spawns into
//! their bag and later release them.
//!
//! ```rust,ignore
//! let slice = fauna_spawns::init(&config, database.clone()).await?;
//! ```

pub mod bag;
pub mod catalog;
mod error;
pub mod geo;
#[cfg(feature = "server")]
pub mod handlers;
pub mod model;
pub mod pool;
pub mod repository;
pub mod seed;
pub mod service;
pub mod store;

pub use crate::error::{SpawnError, SpawnErrorExt};
pub use crate::service::{NearbyQuery, SpawnService};

use crate::repository::Repositories;
use crate::store::SqliteStore;
use fauna_database::{Database, Migration};
use fauna_kernel::domain::config::ApiConfig;
use fauna_kernel::domain::registry::InitializedSlice;
use std::sync::Arc;
use tracing::info;

pub const SLICE: &str = "spawns";

/// Schema of the slice, in application order.
pub const MIGRATIONS: [Migration; 1] =
    [Migration::new(SLICE, "0001", include_str!("../migrations/0001_spawn_pool.sql"))];

/// Spawns feature state
#[fauna_derive::fauna_slice]
pub struct Spawns {
    pub service: SpawnService,
}

/// Builds the slice on the shared database and imports the seed fixture when configured.
///
/// # Errors
/// [`SpawnError::Config`] for invalid `[spawns]` settings, seed and storage errors while importing.
pub async fn init(config: &ApiConfig, database: Database) -> Result<InitializedSlice, SpawnError> {
    let store = Arc::new(SqliteStore::new(database));
    let service = SpawnService::new(Repositories::shared(store), &config.spawns)?;

    if let Some(path) = &config.spawns.seed_file {
        let data = seed::load(path)?;
        service.import(&data).await?;
        info!(path = %path.display(), branches = data.branches.len(), "Seed fixture imported");
    }

    info!("Spawns slice initialized");
    Ok(InitializedSlice::new(Spawns::new(SpawnsInner { service })))
}

#[cfg(feature = "server")]
pub use crate::handlers::router;
