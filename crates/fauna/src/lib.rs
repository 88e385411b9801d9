//! Facade crate for Fauna features and shared modules.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Open the database with [`migrations`] applied.
//! - Call [`init`] to build every feature slice and register them in the API state.
//! - With the `server` feature, [`server::router`] merges the system and feature routes.

pub use fauna_database as database;
pub use fauna_domain as domain;
pub use fauna_kernel as kernel;

use fauna_database::{Database, Migration};
use fauna_domain::config::ApiConfig;
use fauna_domain::registry::InitializedSlice;
use std::borrow::Cow;
use tracing::info;

/// Feature registry for runtime introspection.
pub mod features {
    pub use fauna_players as players;
    pub use fauna_spawns as spawns;

    /// Build-time enabled features (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        #[cfg(feature = "server")]
        "server",
        "spawns",
        "players",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

#[fauna_derive::fauna_error]
pub enum InitError {
    #[error("Spawns slice failed{}: {source}", format_context(.context))]
    Spawns { source: fauna_spawns::SpawnError, context: Option<Cow<'static, str>> },
}

/// Every slice's schema, in the order it must be applied.
#[must_use]
pub fn migrations() -> Vec<Migration> {
    fauna_spawns::MIGRATIONS.into_iter().chain(fauna_players::MIGRATIONS).collect()
}

/// Initialize all features on a migrated database.
///
/// # Errors
/// Returns an error if any feature initialization fails.
pub async fn init(config: &ApiConfig, database: &Database) -> Result<Vec<InitializedSlice>, InitError> {
    let slices = vec![
        features::spawns::init(config, database.clone()).await?,
        features::players::init(database.clone()),
    ];

    info!(slices = slices.len(), "Feature slices initialized");
    Ok(slices)
}

#[cfg(feature = "server")]
pub mod server {
    use fauna_kernel::server::router::system_router;
    use fauna_kernel::server::{ApiState, ApiStateError};
    use fauna_players::Players;
    use fauna_spawns::Spawns;
    use utoipa_axum::router::OpenApiRouter;

    /// System routes plus the routes of every registered slice.
    ///
    /// # Errors
    /// [`ApiStateError::MissingSlice`] when a slice was not registered in `state`.
    pub fn router(state: &ApiState) -> Result<OpenApiRouter<ApiState>, ApiStateError> {
        let spawns = state.try_get_slice::<Spawns>()?.clone();
        let players = state.try_get_slice::<Players>()?.clone();

        Ok(system_router().merge(fauna_spawns::router(spawns)).merge(fauna_players::router(players)))
    }
}
