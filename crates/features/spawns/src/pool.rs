//! Per-branch pools of live spawns and their on-demand replenishment.

use crate::catalog::Catalog;
use crate::error::{SpawnError, SpawnErrorExt};
use crate::model::{Branch, SpawnInstance, Species};
use crate::repository::{SpawnRepository, StoreError};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use fauna_kernel::safe_nanoid;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::sync::Arc;
use tracing::{debug, info, warn};

const RETRY_BACKOFF_MS: u64 = 15;

/// Inclusive range spawn lifetimes are drawn from, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlWindow {
    min_ms: i64,
    max_ms: i64,
}

impl TtlWindow {
    /// # Errors
    /// [`SpawnError::Config`] when the lower bound is zero, above the upper bound
    /// or the bounds do not fit a timestamp offset.
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, SpawnError> {
        let invalid = |message: String| SpawnError::Config {
            message: message.into(),
            context: Some("TTL window".into()),
        };

        if min_ms == 0 {
            return Err(invalid("min_ttl_ms must be greater than zero".to_owned()));
        }
        if min_ms > max_ms {
            return Err(invalid(format!("min_ttl_ms ({min_ms}) exceeds max_ttl_ms ({max_ms})")));
        }
        let max_ms = i64::try_from(max_ms)
            .ok()
            .filter(|ms| Duration::try_milliseconds(*ms).is_some())
            .ok_or_else(|| invalid(format!("max_ttl_ms ({max_ms}) is out of range")))?;
        let min_ms = i64::try_from(min_ms).map_err(|_| invalid("min_ttl_ms is out of range".to_owned()))?;

        Ok(Self { min_ms, max_ms })
    }

    #[must_use]
    pub const fn min(&self) -> Duration {
        Duration::milliseconds(self.min_ms)
    }

    #[must_use]
    pub const fn max(&self) -> Duration {
        Duration::milliseconds(self.max_ms)
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::milliseconds(rng.random_range(self.min_ms..=self.max_ms))
    }
}

/// Read side of the pool.
#[derive(Debug, Clone)]
pub struct SpawnPool {
    spawns: Arc<dyn SpawnRepository>,
}

impl SpawnPool {
    pub fn new(spawns: Arc<dyn SpawnRepository>) -> Self {
        Self { spawns }
    }

    /// Spawns of the branch still alive at `now`.
    ///
    /// # Errors
    /// [`SpawnError::Storage`] on store failure.
    pub async fn active(&self, branch_id: &str, now: DateTime<Utc>) -> Result<Vec<SpawnInstance>, SpawnError> {
        self.spawns.active(branch_id, now).await.context("Reading active spawns")
    }

    /// Hard-deletes spawns expired at or before `cutoff` unless a bag still references them.
    ///
    /// # Errors
    /// [`SpawnError::Storage`] on store failure.
    pub async fn sweep(&self, cutoff: DateTime<Utc>) -> Result<u64, SpawnError> {
        let removed = self.spawns.purge_expired(cutoff).await.context("Sweeping expired spawns")?;
        if removed > 0 {
            info!(removed, %cutoff, "Expired spawns swept");
        }
        Ok(removed)
    }
}

/// Fills under-capacity pools with freshly drawn spawns.
#[derive(Debug, Clone)]
pub struct Replenisher {
    spawns: Arc<dyn SpawnRepository>,
    catalog: Catalog,
    ttl: TtlWindow,
    attempts: u32,
}

impl Replenisher {
    pub fn new(spawns: Arc<dyn SpawnRepository>, catalog: Catalog, ttl: TtlWindow, attempts: u32) -> Self {
        Self { spawns, catalog, ttl, attempts: attempts.max(1) }
    }

    /// Draws `deficit` species uniformly with replacement and gives each a lifetime
    /// from the TTL window. Returns nothing when `species` is empty.
    ///
    /// Timestamps are truncated to milliseconds, the resolution of every store.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        branch: &Branch,
        species: &[Species],
        deficit: usize,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<SpawnInstance> {
        let now = now.trunc_subsecs(3);
        let mut planned = Vec::with_capacity(deficit);
        for _ in 0..deficit {
            let Some(species) = species.choose(rng) else { break };
            planned.push(SpawnInstance {
                id: safe_nanoid!(),
                branch_id: branch.id.clone(),
                species_id: species.id.clone(),
                expires_at: now + self.ttl.draw(rng),
                created_at: now,
            });
        }
        planned
    }

    /// Tops the branch up to its capacity and returns every active spawn.
    ///
    /// The store decides which new rows fit, so concurrent callers never push the
    /// branch over capacity. Store contention is retried a bounded number of times.
    ///
    /// # Errors
    /// * [`SpawnError::Conflict`] when the branch stays locked after every attempt.
    /// * [`SpawnError::Storage`] on any other store failure.
    pub async fn replenish(&self, branch: &Branch, now: DateTime<Utc>) -> Result<Vec<SpawnInstance>, SpawnError> {
        let mut attempt = 1;
        loop {
            match self.try_replenish(branch, now).await {
                Err(SpawnError::Storage { source: StoreError::Busy { .. }, .. }) if attempt < self.attempts => {
                    debug!(branch = %branch.id, attempt, "Branch busy, retrying replenish");
                    tokio::time::sleep(std::time::Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt)))
                        .await;
                    attempt += 1;
                }
                Err(SpawnError::Storage { source: StoreError::Busy { .. }, .. }) => {
                    warn!(branch = %branch.id, attempts = self.attempts, "Branch stayed busy");
                    return Err(SpawnError::conflict("Branch is busy, try again"));
                }
                result => return result,
            }
        }
    }

    async fn try_replenish(&self, branch: &Branch, now: DateTime<Utc>) -> Result<Vec<SpawnInstance>, SpawnError> {
        let mut active = self.spawns.active(&branch.id, now).await.context("Reading active spawns")?;
        let capacity = usize::try_from(branch.capacity).unwrap_or(usize::MAX);
        if active.len() >= capacity {
            active.truncate(capacity);
            return Ok(active);
        }

        let species = self.catalog.entries().await.context("Reading catalog")?;
        if species.is_empty() {
            warn!(branch = %branch.id, "Catalog is empty, nothing to spawn");
            return Ok(active);
        }

        let deficit = capacity - active.len();
        let fresh = {
            let mut rng = rand::rng();
            self.plan(branch, &species, deficit, now, &mut rng)
        };

        let accepted = self
            .spawns
            .insert_within_capacity(&branch.id, branch.capacity, now, &fresh)
            .await
            .context("Inserting spawns")?;
        debug!(branch = %branch.id, deficit, accepted = accepted.len(), "Pool replenished");

        if accepted.len() == fresh.len() {
            active.extend(accepted);
            Ok(active)
        } else {
            // Someone else filled the branch in between.
            let mut active = self.spawns.active(&branch.id, now).await.context("Reading active spawns")?;
            active.truncate(capacity);
            Ok(active)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn species(ids: &[&str]) -> Vec<Species> {
        ids.iter()
            .map(|id| Species { id: (*id).into(), name: id.to_uppercase(), description: String::new(), habitat_id: None })
            .collect()
    }

    fn branch(capacity: u32) -> Branch {
        Branch { id: "b1".into(), longitude: 0.0, latitude: 0.0, capacity, habitat_id: None }
    }

    fn replenisher() -> Replenisher {
        let store = Arc::new(MemoryStore::default());
        let ttl = TtlWindow::new(3_600_000, 36_000_000).unwrap();
        Replenisher::new(store.clone(), Catalog::new(store), ttl, 3)
    }

    #[test]
    fn ttl_window_rejects_bad_bounds() {
        assert!(matches!(TtlWindow::new(0, 10), Err(SpawnError::Config { .. })));
        assert!(matches!(TtlWindow::new(20, 10), Err(SpawnError::Config { .. })));
        assert!(matches!(TtlWindow::new(1, u64::MAX), Err(SpawnError::Config { .. })));
        assert!(TtlWindow::new(5, 5).is_ok());
    }

    #[test]
    fn ttl_draw_stays_in_window() {
        let window = TtlWindow::new(1_000, 2_000).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let ttl = window.draw(&mut rng);
            assert!(ttl >= window.min() && ttl <= window.max());
        }

        let fixed = TtlWindow::new(5, 5).unwrap();
        assert_eq!(fixed.draw(&mut rng), Duration::milliseconds(5));
    }

    #[test]
    fn plan_draws_from_catalog_with_replacement() {
        let replenisher = replenisher();
        let catalog = species(&["a"]);
        let now = Utc::now().trunc_subsecs(3);
        let mut rng = StdRng::seed_from_u64(42);

        let planned = replenisher.plan(&branch(4), &catalog, 4, now, &mut rng);
        assert_eq!(planned.len(), 4);
        assert!(planned.iter().all(|s| s.species_id == "a" && s.branch_id == "b1" && s.created_at == now));

        let mut ids: Vec<_> = planned.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn plan_with_empty_catalog_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(replenisher().plan(&branch(3), &[], 3, Utc::now(), &mut rng).is_empty());
    }
}
