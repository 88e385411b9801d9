//! Entry point used by the HTTP handlers: validates input, then drives the
//! spatial index, the pool, the replenisher and the bag store.

use crate::bag::BagStore;
use crate::catalog::Catalog;
use crate::error::{SpawnError, SpawnErrorExt};
use crate::geo::SpatialIndex;
use crate::model::{BagEntry, BagView, Branch, NearbyBranch, ReferenceData, SpawnInstance};
use crate::pool::{Replenisher, SpawnPool, TtlWindow};
use crate::repository::{BranchRepository, ReferenceRepository, Repositories};
use crate::seed;
use chrono::{DateTime, Duration, Utc};
use fauna_domain::config::SpawnsConfig;
use fauna_kernel::prelude::ResourceGuard;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const BRANCH_FIELD: &str = "id";

/// A nearby lookup as received from clients.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NearbyQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Metres; the configured default applies when absent.
    pub max_distance: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SpawnService {
    branches: Arc<dyn BranchRepository>,
    reference: Arc<dyn ReferenceRepository>,
    index: SpatialIndex,
    pool: SpawnPool,
    replenisher: Replenisher,
    bag: BagStore,
    default_max_distance: f64,
}

impl SpawnService {
    /// # Errors
    /// [`SpawnError::Config`] when the TTL window or the default distance is invalid.
    pub fn new(repositories: Repositories, config: &SpawnsConfig) -> Result<Self, SpawnError> {
        let ttl = TtlWindow::new(config.min_ttl_ms, config.max_ttl_ms)?;
        let default_max_distance = config.default_max_distance_m;
        if !default_max_distance.is_finite() || default_max_distance < 0.0 {
            return Err(SpawnError::Config {
                message: format!("default_max_distance_m ({default_max_distance}) must be a non-negative number")
                    .into(),
                context: None,
            });
        }

        Ok(Self {
            index: SpatialIndex::new(repositories.branches.clone()),
            pool: SpawnPool::new(repositories.spawns.clone()),
            replenisher: Replenisher::new(
                repositories.spawns.clone(),
                Catalog::new(repositories.catalog),
                ttl,
                config.replenish_attempts,
            ),
            bag: BagStore::new(repositories.bag, repositories.spawns),
            branches: repositories.branches,
            reference: repositories.reference,
            default_max_distance,
        })
    }

    /// Branches within the requested distance, nearest first.
    ///
    /// # Errors
    /// [`SpawnError::Validation`] for missing or out of range coordinates and a
    /// negative or non-finite distance; [`SpawnError::Storage`] on store failure.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn nearby(&self, query: NearbyQuery) -> Result<Vec<NearbyBranch>, SpawnError> {
        let latitude = coordinate(query.latitude, "latitude", 90.0)?;
        let longitude = coordinate(query.longitude, "longitude", 180.0)?;
        let max_distance = match query.max_distance {
            None => self.default_max_distance,
            Some(distance) if distance.is_finite() && distance >= 0.0 => distance,
            Some(_) => return Err(SpawnError::invalid("maxDistance", "must be a non-negative number")),
        };

        self.index.nearby(latitude, longitude, max_distance).await.context("Nearby lookup")
    }

    /// Active spawns of the branch, replenished up to its capacity first.
    ///
    /// Never returns more than `capacity` spawns, oldest first.
    ///
    /// # Errors
    /// * [`SpawnError::Validation`] for a malformed branch id.
    /// * [`SpawnError::NotFound`] for an unknown branch.
    /// * [`SpawnError::Conflict`] when the branch stays busy.
    /// * [`SpawnError::Storage`] on store failure.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn active_spawns(&self, branch_id: &str, now: DateTime<Utc>) -> Result<Vec<SpawnInstance>, SpawnError> {
        let branch = self.branch(branch_id).await?;

        let mut active = self.pool.active(&branch.id, now).await?;
        let capacity = usize::try_from(branch.capacity).unwrap_or(usize::MAX);
        if active.len() >= capacity {
            debug!(branch = %branch.id, active = active.len(), "Pool is full");
            // A re-import may have lowered the capacity below what is already live.
            active.truncate(capacity);
            return Ok(active);
        }

        self.replenisher.replenish(&branch, now).await
    }

    /// # Errors
    /// [`SpawnError::Validation`], [`SpawnError::NotFound`] for an unknown branch.
    pub async fn branch(&self, branch_id: &str) -> Result<Branch, SpawnError> {
        let branch_id = ResourceGuard::verify(branch_id, BRANCH_FIELD)?;
        self.branches
            .branch(&branch_id)
            .await
            .context("Loading branch")?
            .ok_or_else(|| SpawnError::not_found("Branch not found"))
    }

    /// # Errors
    /// See [`BagStore::claim`].
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn claim(&self, player: &str, spawn_id: &str, now: DateTime<Utc>) -> Result<BagEntry, SpawnError> {
        self.bag.claim(player, spawn_id, now).await
    }

    /// # Errors
    /// See [`BagStore::list`].
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn list_bag(&self, player: &str) -> Result<Vec<BagView>, SpawnError> {
        self.bag.list(player).await
    }

    /// # Errors
    /// See [`BagStore::release`].
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn release(&self, entry_id: &str, now: DateTime<Utc>) -> Result<BagEntry, SpawnError> {
        self.bag.release(entry_id, now).await
    }

    /// Deletes spawns that expired more than `grace` ago and are in nobody's bag.
    ///
    /// # Errors
    /// [`SpawnError::Storage`] on store failure.
    #[instrument(skip(self))]
    pub async fn sweep(&self, now: DateTime<Utc>, grace: Duration) -> Result<u64, SpawnError> {
        self.pool.sweep(now - grace).await
    }

    /// Validates and upserts reference data.
    ///
    /// # Errors
    /// [`SpawnError::Validation`] naming the first bad record; [`SpawnError::Storage`] on store failure.
    #[instrument(skip_all, fields(
        habitats = data.habitats.len(),
        species = data.species.len(),
        branches = data.branches.len(),
    ))]
    pub async fn import(&self, data: &ReferenceData) -> Result<(), SpawnError> {
        seed::validate(data)?;
        self.reference.import(data).await.context("Importing reference data")?;
        info!("Reference data imported");
        Ok(())
    }
}

fn coordinate(value: Option<f64>, field: &'static str, bound: f64) -> Result<f64, SpawnError> {
    let value = value.ok_or_else(|| SpawnError::invalid(field, "is required"))?;
    if value.is_finite() && (-bound..=bound).contains(&value) {
        Ok(value)
    } else {
        Err(SpawnError::invalid(field, format!("must be between -{bound} and {bound}")))
    }
}
