//! Reference data and the records produced by the spawn pool.

use chrono::{DateTime, Utc};
use fauna_derive::api_model;

/// Fixed place on the map that hosts spawns.
#[api_model]
#[derive(Clone, PartialEq)]
pub struct Branch {
    pub id: String,
    pub longitude: f64,
    pub latitude: f64,
    /// Upper bound of simultaneously active spawns.
    pub capacity: u32,
    #[serde(default)]
    pub habitat_id: Option<String>,
}

#[api_model]
#[derive(Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Habitat {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Catalog entry: a species that can be drawn into a branch pool.
#[api_model]
#[derive(Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Species {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub habitat_id: Option<String>,
}

/// A species placed at a branch until `expires_at`. Never mutated after creation.
#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct SpawnInstance {
    pub id: String,
    pub branch_id: String,
    pub species_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SpawnInstance {
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// A spawn claimed into a player's bag.
#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct BagEntry {
    pub id: String,
    pub player_id: String,
    pub spawn_id: String,
    /// Flips to `true` once, on release.
    pub delivered: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bag entry joined with whatever is still known about its spawn.
#[api_model]
#[derive(Clone, PartialEq)]
pub struct BagView {
    #[serde(flatten)]
    pub entry: BagEntry,
    pub spawn: Option<SpawnInstance>,
    pub species: Option<Species>,
    pub branch: Option<Branch>,
    pub habitat: Option<Habitat>,
}

/// Branch found by a nearby lookup.
#[api_model]
#[derive(Clone, PartialEq)]
pub struct NearbyBranch {
    #[serde(flatten)]
    pub branch: Branch,
    /// Great-circle distance from the query point in metres.
    pub distance: f64,
}

/// Reference data imported in one go.
#[api_model]
#[derive(Clone, Default)]
pub struct ReferenceData {
    #[serde(default)]
    pub habitats: Vec<Habitat>,
    #[serde(default)]
    pub species: Vec<Species>,
    #[serde(default)]
    pub branches: Vec<Branch>,
}
