use crate::geo::BoundingBox;
use crate::model::{BagEntry, BagView, Branch, Habitat, ReferenceData, SpawnInstance, Species};
use crate::repository::{
    BagRepository, BranchRepository, CatalogRepository, ReferenceRepository, SpawnRepository, StoreError,
    StoreResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

type Pool = Arc<Mutex<Vec<SpawnInstance>>>;

#[derive(Debug, Default)]
struct BagTable {
    entries: FxHashMap<String, BagEntry>,
    by_spawn: FxHashMap<String, String>,
}

/// Everything kept in process memory.
///
/// Each branch pool sits behind its own mutex, so replenishing one branch never
/// blocks another. Claims compare-and-set on the spawn id under the bag lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    habitats: RwLock<FxHashMap<String, Habitat>>,
    species: RwLock<FxHashMap<String, Species>>,
    branches: RwLock<FxHashMap<String, Branch>>,
    pools: RwLock<FxHashMap<String, Pool>>,
    spawn_branch: RwLock<FxHashMap<String, String>>,
    bag: Mutex<BagTable>,
}

impl MemoryStore {
    /// Store preloaded with reference data.
    #[must_use]
    pub fn with_reference(data: &ReferenceData) -> Self {
        let store = Self::default();
        store.load(data);
        store
    }

    fn load(&self, data: &ReferenceData) {
        let mut habitats = self.habitats.write();
        for habitat in &data.habitats {
            habitats.insert(habitat.id.clone(), habitat.clone());
        }
        drop(habitats);

        let mut species = self.species.write();
        for entry in &data.species {
            species.insert(entry.id.clone(), entry.clone());
        }
        drop(species);

        let mut branches = self.branches.write();
        for branch in &data.branches {
            branches.insert(branch.id.clone(), branch.clone());
        }
    }

    fn pool(&self, branch_id: &str) -> Pool {
        if let Some(pool) = self.pools.read().get(branch_id) {
            return Arc::clone(pool);
        }
        Arc::clone(self.pools.write().entry(branch_id.to_owned()).or_default())
    }

    fn find_spawn(&self, id: &str) -> Option<SpawnInstance> {
        let branch_id = self.spawn_branch.read().get(id).cloned()?;
        let pool = self.pools.read().get(&branch_id).cloned()?;
        let found = pool.lock().iter().find(|spawn| spawn.id == id).cloned();
        found
    }

    fn view(&self, entry: BagEntry) -> BagView {
        let spawn = self.find_spawn(&entry.spawn_id);
        let species = spawn.as_ref().and_then(|s| self.species.read().get(&s.species_id).cloned());
        let branch = spawn.as_ref().and_then(|s| self.branches.read().get(&s.branch_id).cloned());
        let habitat = branch
            .as_ref()
            .and_then(|b| b.habitat_id.as_ref())
            .and_then(|id| self.habitats.read().get(id).cloned());

        BagView { entry, spawn, species, branch, habitat }
    }
}

#[async_trait]
impl BranchRepository for MemoryStore {
    async fn branch(&self, id: &str) -> StoreResult<Option<Branch>> {
        Ok(self.branches.read().get(id).cloned())
    }

    async fn branches_within(&self, bounds: &BoundingBox) -> StoreResult<Vec<Branch>> {
        Ok(self
            .branches
            .read()
            .values()
            .filter(|b| bounds.contains(b.latitude, b.longitude))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn species(&self) -> StoreResult<Vec<Species>> {
        Ok(self.species.read().values().cloned().collect())
    }

    async fn species_by_id(&self, id: &str) -> StoreResult<Option<Species>> {
        Ok(self.species.read().get(id).cloned())
    }
}

#[async_trait]
impl ReferenceRepository for MemoryStore {
    async fn import(&self, data: &ReferenceData) -> StoreResult<()> {
        self.load(data);
        Ok(())
    }
}

#[async_trait]
impl SpawnRepository for MemoryStore {
    async fn spawn(&self, id: &str) -> StoreResult<Option<SpawnInstance>> {
        Ok(self.find_spawn(id))
    }

    async fn active(&self, branch_id: &str, now: DateTime<Utc>) -> StoreResult<Vec<SpawnInstance>> {
        let Some(pool) = self.pools.read().get(branch_id).cloned() else {
            return Ok(Vec::new());
        };
        let mut active: Vec<_> = pool.lock().iter().filter(|s| s.is_active(now)).cloned().collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn insert_within_capacity(
        &self,
        branch_id: &str,
        capacity: u32,
        now: DateTime<Utc>,
        fresh: &[SpawnInstance],
    ) -> StoreResult<Vec<SpawnInstance>> {
        if let Some(stray) = fresh.iter().find(|s| s.branch_id != branch_id) {
            return Err(StoreError::Corrupt {
                message: format!("spawn {} belongs to branch {}", stray.id, stray.branch_id).into(),
                context: Some(branch_id.to_owned().into()),
            });
        }

        let capacity = usize::try_from(capacity).unwrap_or(usize::MAX);
        let pool = self.pool(branch_id);
        let mut spawns = pool.lock();

        let room = capacity.saturating_sub(spawns.iter().filter(|s| s.is_active(now)).count());
        let accepted: Vec<_> = fresh.iter().take(room).cloned().collect();
        spawns.extend(accepted.iter().cloned());

        let mut index = self.spawn_branch.write();
        for spawn in &accepted {
            index.insert(spawn.id.clone(), branch_id.to_owned());
        }

        Ok(accepted)
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let claimed: FxHashSet<String> = self.bag.lock().by_spawn.keys().cloned().collect();
        let pools: Vec<Pool> = self.pools.read().values().cloned().collect();

        let mut removed = Vec::new();
        for pool in pools {
            pool.lock().retain(|spawn| {
                let purge = spawn.expires_at <= cutoff && !claimed.contains(&spawn.id);
                if purge {
                    removed.push(spawn.id.clone());
                }
                !purge
            });
        }

        let mut index = self.spawn_branch.write();
        for id in &removed {
            index.remove(id);
        }

        Ok(removed.len() as u64)
    }
}

#[async_trait]
impl BagRepository for MemoryStore {
    async fn insert(&self, entry: &BagEntry) -> StoreResult<()> {
        let mut bag = self.bag.lock();
        if bag.by_spawn.contains_key(&entry.spawn_id) || bag.entries.contains_key(&entry.id) {
            return Err(StoreError::Duplicate {
                what: "claim".into(),
                context: Some(entry.spawn_id.clone().into()),
            });
        }
        bag.by_spawn.insert(entry.spawn_id.clone(), entry.id.clone());
        bag.entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn entry(&self, id: &str) -> StoreResult<Option<BagEntry>> {
        Ok(self.bag.lock().entries.get(id).cloned())
    }

    async fn views(&self, player_id: &str) -> StoreResult<Vec<BagView>> {
        let mut entries: Vec<BagEntry> =
            self.bag.lock().entries.values().filter(|e| e.player_id == player_id).cloned().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        Ok(entries.into_iter().map(|entry| self.view(entry)).collect())
    }

    async fn mark_delivered(&self, id: &str, now: DateTime<Utc>) -> StoreResult<Option<BagEntry>> {
        let mut bag = self.bag.lock();
        let Some(entry) = bag.entries.get_mut(id) else {
            return Ok(None);
        };
        if !entry.delivered {
            entry.delivered = true;
            entry.updated_at = now;
        }
        Ok(Some(entry.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn spawn(id: &str, branch: &str, now: DateTime<Utc>, ttl_secs: i64) -> SpawnInstance {
        SpawnInstance {
            id: id.into(),
            branch_id: branch.into(),
            species_id: "fox".into(),
            expires_at: now + Duration::seconds(ttl_secs),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn insert_truncates_at_capacity() {
        let store = MemoryStore::default();
        let now = Utc::now();
        let fresh: Vec<_> = (0..4).map(|i| spawn(&format!("s{i}"), "b1", now, 60)).collect();

        let accepted = store.insert_within_capacity("b1", 3, now, &fresh).await.unwrap();
        assert_eq!(accepted.len(), 3);
        assert_eq!(accepted[0].id, "s0");

        let again = store.insert_within_capacity("b1", 3, now, &fresh[3..]).await.unwrap();
        assert!(again.is_empty());
        assert_eq!(store.active("b1", now).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn expired_spawns_free_capacity() {
        let store = MemoryStore::default();
        let now = Utc::now();
        store.insert_within_capacity("b1", 1, now, &[spawn("old", "b1", now, 10)]).await.unwrap();

        let later = now + Duration::seconds(10);
        assert!(store.active("b1", later).await.unwrap().is_empty());

        let accepted = store.insert_within_capacity("b1", 1, later, &[spawn("new", "b1", later, 10)]).await.unwrap();
        assert_eq!(accepted.len(), 1);
    }

    #[tokio::test]
    async fn rejects_rows_of_another_branch() {
        let store = MemoryStore::default();
        let now = Utc::now();
        let err = store.insert_within_capacity("b1", 3, now, &[spawn("x", "b2", now, 10)]).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn second_claim_is_duplicate() {
        let store = MemoryStore::default();
        let now = Utc::now();
        let entry = |id: &str, player: &str| BagEntry {
            id: id.into(),
            player_id: player.into(),
            spawn_id: "s1".into(),
            delivered: false,
            created_at: now,
            updated_at: now,
        };

        store.insert(&entry("e1", "p1")).await.unwrap();
        let err = store.insert(&entry("e2", "p2")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert!(store.entry("e2").await.unwrap().is_none());
    }
}
