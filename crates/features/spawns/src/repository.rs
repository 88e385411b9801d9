//! Storage seams of the slice. Every trait has an in-memory and a `SQLite`
//! implementation under [`crate::store`].

use crate::geo::BoundingBox;
use crate::model::{BagEntry, BagView, Branch, ReferenceData, SpawnInstance, Species};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by the stores.
#[fauna_derive::fauna_error]
pub enum StoreError {
    #[error("SQL error{}: {source}", format_context(.context))]
    Sqlx { source: sqlx::Error, context: Option<Cow<'static, str>> },

    /// Another writer holds the lock; the operation may be retried.
    #[error("Store busy{}", format_context(.context))]
    Busy { context: Option<Cow<'static, str>> },

    /// A uniqueness rule rejected the write.
    #[error("Duplicate {what}{}", format_context(.context))]
    Duplicate { what: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A stored row could not be turned back into a model.
    #[error("Corrupt row{}: {message}", format_context(.context))]
    Corrupt { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl StoreError {
    /// Sorts a raw `sqlx` failure into busy, duplicate or generic.
    pub(crate) fn classify(err: sqlx::Error, context: &'static str) -> Self {
        if fauna_database::is_contention(&err) {
            Self::Busy { context: Some(context.into()) }
        } else if fauna_database::is_unique_violation(&err) {
            Self::Duplicate { what: "row".into(), context: Some(context.into()) }
        } else {
            Self::Sqlx { source: err, context: Some(context.into()) }
        }
    }
}

#[async_trait]
pub trait BranchRepository: Debug + Send + Sync {
    async fn branch(&self, id: &str) -> StoreResult<Option<Branch>>;

    /// Coarse prefilter: every branch inside the box, in no particular order.
    async fn branches_within(&self, bounds: &BoundingBox) -> StoreResult<Vec<Branch>>;
}

#[async_trait]
pub trait CatalogRepository: Debug + Send + Sync {
    async fn species(&self) -> StoreResult<Vec<Species>>;

    async fn species_by_id(&self, id: &str) -> StoreResult<Option<Species>>;
}

/// Bulk import used by seeding.
#[async_trait]
pub trait ReferenceRepository: Debug + Send + Sync {
    /// Inserts or replaces every record by id.
    async fn import(&self, data: &ReferenceData) -> StoreResult<()>;
}

#[async_trait]
pub trait SpawnRepository: Debug + Send + Sync {
    async fn spawn(&self, id: &str) -> StoreResult<Option<SpawnInstance>>;

    /// Spawns of the branch with `expires_at > now`, oldest first.
    async fn active(&self, branch_id: &str, now: DateTime<Utc>) -> StoreResult<Vec<SpawnInstance>>;

    /// Inserts `fresh` in order while the branch has fewer than `capacity` active spawns
    /// and returns the accepted prefix. Check and insert are atomic per branch.
    ///
    /// Fails with [`StoreError::Busy`] when the branch is locked by another writer.
    async fn insert_within_capacity(
        &self,
        branch_id: &str,
        capacity: u32,
        now: DateTime<Utc>,
        fresh: &[SpawnInstance],
    ) -> StoreResult<Vec<SpawnInstance>>;

    /// Deletes spawns that expired at or before `cutoff` and are in nobody's bag.
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait BagRepository: Debug + Send + Sync {
    /// Stores a claim. Fails with [`StoreError::Duplicate`] when the spawn is already claimed.
    async fn insert(&self, entry: &BagEntry) -> StoreResult<()>;

    async fn entry(&self, id: &str) -> StoreResult<Option<BagEntry>>;

    /// Entries of the player joined with spawn, species, branch and habitat, newest first.
    async fn views(&self, player_id: &str) -> StoreResult<Vec<BagView>>;

    /// Sets `delivered` if it was not yet set and returns the entry as stored.
    async fn mark_delivered(&self, id: &str, now: DateTime<Utc>) -> StoreResult<Option<BagEntry>>;
}

/// Every repository the slice needs, usually backed by one store.
#[derive(Debug, Clone)]
pub struct Repositories {
    pub branches: Arc<dyn BranchRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub reference: Arc<dyn ReferenceRepository>,
    pub spawns: Arc<dyn SpawnRepository>,
    pub bag: Arc<dyn BagRepository>,
}

impl Repositories {
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: BranchRepository + CatalogRepository + ReferenceRepository + SpawnRepository + BagRepository + 'static,
    {
        Self {
            branches: store.clone(),
            catalog: store.clone(),
            reference: store.clone(),
            spawns: store.clone(),
            bag: store,
        }
    }
}
