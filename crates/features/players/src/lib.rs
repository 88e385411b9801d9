//! Player accounts slice: signup and login backed by Argon2id digests.

pub mod crypto;
mod error;
#[cfg(feature = "server")]
pub mod handlers;
pub mod model;
pub mod repository;
pub mod service;
pub mod store;

pub use crate::error::{PlayerError, PlayerErrorExt};
pub use crate::service::PlayerService;

use crate::crypto::Argon2Authenticator;
use crate::store::SqlitePlayers;
use fauna_database::{Database, Migration};
use fauna_kernel::domain::registry::InitializedSlice;
use std::sync::Arc;

pub const SLICE: &str = "players";

pub const MIGRATIONS: [Migration; 1] =
    [Migration::new(SLICE, "0001", include_str!("../migrations/0001_players.sql"))];

/// Players feature state
#[fauna_derive::fauna_slice]
pub struct Players {
    pub service: PlayerService,
}

pub fn init(database: Database) -> InitializedSlice {
    let service = PlayerService::new(Arc::new(SqlitePlayers::new(database)), Arc::new(Argon2Authenticator::new()));
    tracing::info!("Players slice initialized");
    InitializedSlice::new(Players::new(PlayersInner { service }))
}

#[cfg(feature = "server")]
pub use crate::handlers::router;
