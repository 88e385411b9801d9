//! Player bags: claiming spawns and releasing them.

use crate::error::{SpawnError, SpawnErrorExt};
use crate::model::{BagEntry, BagView};
use crate::repository::{BagRepository, SpawnRepository, StoreError};
use chrono::{DateTime, SubsecRound, Utc};
use fauna_kernel::prelude::ResourceGuard;
use fauna_kernel::safe_nanoid;
use std::sync::Arc;
use tracing::{debug, info};

pub const PLAYER_FIELD: &str = "player";
pub const SPAWN_FIELD: &str = "spawnInstanceId";
pub const ENTRY_FIELD: &str = "id";

#[derive(Debug, Clone)]
pub struct BagStore {
    entries: Arc<dyn BagRepository>,
    spawns: Arc<dyn SpawnRepository>,
}

impl BagStore {
    pub fn new(entries: Arc<dyn BagRepository>, spawns: Arc<dyn SpawnRepository>) -> Self {
        Self { entries, spawns }
    }

    /// Moves an active spawn into the player's bag. A spawn can be claimed once.
    ///
    /// # Errors
    /// * [`SpawnError::Validation`] for an empty or malformed id.
    /// * [`SpawnError::NotFound`] when the spawn does not exist.
    /// * [`SpawnError::Conflict`] when the spawn expired or was already claimed.
    /// * [`SpawnError::Storage`] on store failure.
    pub async fn claim(&self, player: &str, spawn_id: &str, now: DateTime<Utc>) -> Result<BagEntry, SpawnError> {
        let player = ResourceGuard::verify(player, PLAYER_FIELD)?;
        let spawn_id = ResourceGuard::verify(spawn_id, SPAWN_FIELD)?;

        let spawn = self
            .spawns
            .spawn(&spawn_id)
            .await
            .context("Loading spawn")?
            .ok_or_else(|| SpawnError::not_found("Spawn not found"))?;
        if !spawn.is_active(now) {
            return Err(SpawnError::conflict("Spawn has expired"));
        }

        let now = now.trunc_subsecs(3);
        let entry = BagEntry {
            id: safe_nanoid!(),
            player_id: player,
            spawn_id,
            delivered: false,
            created_at: now,
            updated_at: now,
        };
        match self.entries.insert(&entry).await {
            Ok(()) => {
                info!(player = %entry.player_id, spawn = %entry.spawn_id, entry = %entry.id, "Spawn claimed");
                Ok(entry)
            }
            Err(StoreError::Duplicate { .. }) => {
                debug!(spawn = %entry.spawn_id, "Spawn already claimed");
                Err(SpawnError::conflict("Spawn already claimed"))
            }
            Err(err) => Err(err).context("Storing claim"),
        }
    }

    /// The player's entries, newest first.
    ///
    /// # Errors
    /// [`SpawnError::Validation`] for a bad player id, [`SpawnError::Storage`] on store failure.
    pub async fn list(&self, player: &str) -> Result<Vec<BagView>, SpawnError> {
        let player = ResourceGuard::verify(player, PLAYER_FIELD)?;
        self.entries.views(&player).await.context("Listing bag")
    }

    /// Marks the entry delivered. Releasing a delivered entry returns it unchanged.
    ///
    /// # Errors
    /// * [`SpawnError::Validation`] for a malformed id.
    /// * [`SpawnError::NotFound`] when no such entry exists.
    /// * [`SpawnError::Storage`] on store failure.
    pub async fn release(&self, id: &str, now: DateTime<Utc>) -> Result<BagEntry, SpawnError> {
        let id = ResourceGuard::verify(id, ENTRY_FIELD)?;
        let entry = self
            .entries
            .mark_delivered(&id, now.trunc_subsecs(3))
            .await
            .context("Releasing bag entry")?
            .ok_or_else(|| SpawnError::not_found("Bag entry not found"))?;

        debug!(entry = %entry.id, "Bag entry released");
        Ok(entry)
    }
}
