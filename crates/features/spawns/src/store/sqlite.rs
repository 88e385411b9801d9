use crate::geo::BoundingBox;
use crate::model::{BagEntry, BagView, Branch, Habitat, ReferenceData, SpawnInstance, Species};
use crate::repository::{
    BagRepository, BranchRepository, CatalogRepository, ReferenceRepository, SpawnRepository, StoreError,
    StoreResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fauna_database::Database;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use tracing::trace;

const BRANCH_COLUMNS: &str = "id, longitude, latitude, capacity, habitat_id";
const SPAWN_COLUMNS: &str = "id, branch_id, species_id, expires_at, created_at";
const BAG_COLUMNS: &str = "id, player_id, spawn_id, delivered, created_at, updated_at";

// Inserts one spawn only while the branch still has room. ?6 is `now`, ?7 the capacity.
const INSERT_IF_ROOM: &str = "INSERT INTO spawn (id, branch_id, species_id, expires_at, created_at) \
     SELECT ?1, ?2, ?3, ?4, ?5 \
     WHERE (SELECT COUNT(*) FROM spawn WHERE branch_id = ?2 AND expires_at > ?6) < ?7";

const BAG_VIEWS: &str = "SELECT \
        e.id, e.player_id, e.spawn_id, e.delivered, e.created_at, e.updated_at, \
        s.id AS spawn_id_, s.branch_id AS spawn_branch_id, s.species_id AS spawn_species_id, \
        s.expires_at AS spawn_expires_at, s.created_at AS spawn_created_at, \
        sp.id AS species_id_, sp.name AS species_name, sp.description AS species_description, \
        sp.habitat_id AS species_habitat_id, \
        b.id AS branch_id_, b.longitude AS branch_longitude, b.latitude AS branch_latitude, \
        b.capacity AS branch_capacity, b.habitat_id AS branch_habitat_id, \
        h.id AS habitat_id_, h.name AS habitat_name, h.description AS habitat_description \
     FROM bag_entry e \
     LEFT JOIN spawn s ON s.id = e.spawn_id \
     LEFT JOIN species sp ON sp.id = s.species_id \
     LEFT JOIN branch b ON b.id = s.branch_id \
     LEFT JOIN habitat h ON h.id = b.habitat_id \
     WHERE e.player_id = ?1 \
     ORDER BY e.created_at DESC, e.id DESC";

fn timestamp(millis: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| StoreError::Corrupt {
        message: format!("timestamp {millis} out of range").into(),
        context: None,
    })
}

#[derive(FromRow)]
struct BranchRow {
    id: String,
    longitude: f64,
    latitude: f64,
    capacity: i64,
    habitat_id: Option<String>,
}

impl TryFrom<BranchRow> for Branch {
    type Error = StoreError;

    fn try_from(row: BranchRow) -> Result<Self, Self::Error> {
        let capacity = u32::try_from(row.capacity).map_err(|_| StoreError::Corrupt {
            message: format!("capacity {} of branch {}", row.capacity, row.id).into(),
            context: None,
        })?;
        Ok(Self {
            id: row.id,
            longitude: row.longitude,
            latitude: row.latitude,
            capacity,
            habitat_id: row.habitat_id,
        })
    }
}

#[derive(FromRow)]
struct SpawnRow {
    id: String,
    branch_id: String,
    species_id: String,
    expires_at: i64,
    created_at: i64,
}

impl TryFrom<SpawnRow> for SpawnInstance {
    type Error = StoreError;

    fn try_from(row: SpawnRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            branch_id: row.branch_id,
            species_id: row.species_id,
            expires_at: timestamp(row.expires_at)?,
            created_at: timestamp(row.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct BagRow {
    id: String,
    player_id: String,
    spawn_id: String,
    delivered: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<BagRow> for BagEntry {
    type Error = StoreError;

    fn try_from(row: BagRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            player_id: row.player_id,
            spawn_id: row.spawn_id,
            delivered: row.delivered,
            created_at: timestamp(row.created_at)?,
            updated_at: timestamp(row.updated_at)?,
        })
    }
}

fn convert<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn bag_view(row: &SqliteRow) -> Result<BagView, sqlx::Error> {
    let entry = BagRow::from_row(row)?;

    let spawn = match row.try_get::<Option<String>, _>("spawn_id_")? {
        Some(id) => Some(SpawnRow {
            id,
            branch_id: row.try_get("spawn_branch_id")?,
            species_id: row.try_get("spawn_species_id")?,
            expires_at: row.try_get("spawn_expires_at")?,
            created_at: row.try_get("spawn_created_at")?,
        }),
        None => None,
    };
    let species = match row.try_get::<Option<String>, _>("species_id_")? {
        Some(id) => Some(Species {
            id,
            name: row.try_get("species_name")?,
            description: row.try_get("species_description")?,
            habitat_id: row.try_get("species_habitat_id")?,
        }),
        None => None,
    };
    let branch = match row.try_get::<Option<String>, _>("branch_id_")? {
        Some(id) => Some(BranchRow {
            id,
            longitude: row.try_get("branch_longitude")?,
            latitude: row.try_get("branch_latitude")?,
            capacity: row.try_get("branch_capacity")?,
            habitat_id: row.try_get("branch_habitat_id")?,
        }),
        None => None,
    };
    let habitat = match row.try_get::<Option<String>, _>("habitat_id_")? {
        Some(id) => Some(Habitat {
            id,
            name: row.try_get("habitat_name")?,
            description: row.try_get("habitat_description")?,
        }),
        None => None,
    };

    let decode = |err: StoreError| sqlx::Error::Decode(Box::new(err));
    Ok(BagView {
        entry: entry.try_into().map_err(decode)?,
        spawn: spawn.map(SpawnInstance::try_from).transpose().map_err(decode)?,
        species,
        branch: branch.map(Branch::try_from).transpose().map_err(decode)?,
        habitat,
    })
}

/// Repositories backed by the shared `SQLite` pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BranchRepository for SqliteStore {
    async fn branch(&self, id: &str) -> StoreResult<Option<Branch>> {
        let row: Option<BranchRow> = sqlx::query_as(&format!("SELECT {BRANCH_COLUMNS} FROM branch WHERE id = ?1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| StoreError::classify(e, "Loading branch"))?;
        row.map(Branch::try_from).transpose()
    }

    async fn branches_within(&self, bounds: &BoundingBox) -> StoreResult<Vec<Branch>> {
        let rows: Vec<BranchRow> = sqlx::query_as(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branch \
             WHERE latitude BETWEEN ?1 AND ?2 AND longitude BETWEEN ?3 AND ?4"
        ))
        .bind(bounds.min_lat)
        .bind(bounds.max_lat)
        .bind(bounds.min_lng)
        .bind(bounds.max_lng)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| StoreError::classify(e, "Searching branches"))?;
        convert(rows)
    }
}

#[async_trait]
impl CatalogRepository for SqliteStore {
    async fn species(&self) -> StoreResult<Vec<Species>> {
        sqlx::query_as("SELECT id, name, description, habitat_id FROM species ORDER BY id")
            .fetch_all(self.db.pool())
            .await
            .map_err(|e| StoreError::classify(e, "Listing species"))
    }

    async fn species_by_id(&self, id: &str) -> StoreResult<Option<Species>> {
        sqlx::query_as("SELECT id, name, description, habitat_id FROM species WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| StoreError::classify(e, "Loading species"))
    }
}

#[async_trait]
impl ReferenceRepository for SqliteStore {
    async fn import(&self, data: &ReferenceData) -> StoreResult<()> {
        let classify = |e: sqlx::Error| StoreError::classify(e, "Importing reference data");
        let mut tx = self.db.begin().await.map_err(classify)?;

        for habitat in &data.habitats {
            sqlx::query(
                "INSERT INTO habitat (id, name, description) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, description = excluded.description",
            )
            .bind(&habitat.id)
            .bind(&habitat.name)
            .bind(&habitat.description)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        }

        for species in &data.species {
            sqlx::query(
                "INSERT INTO species (id, name, description, habitat_id) VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, description = excluded.description, \
                 habitat_id = excluded.habitat_id",
            )
            .bind(&species.id)
            .bind(&species.name)
            .bind(&species.description)
            .bind(&species.habitat_id)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        }

        for branch in &data.branches {
            sqlx::query(
                "INSERT INTO branch (id, longitude, latitude, capacity, habitat_id) VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(id) DO UPDATE SET longitude = excluded.longitude, latitude = excluded.latitude, \
                 capacity = excluded.capacity, habitat_id = excluded.habitat_id",
            )
            .bind(&branch.id)
            .bind(branch.longitude)
            .bind(branch.latitude)
            .bind(i64::from(branch.capacity))
            .bind(&branch.habitat_id)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        }

        tx.commit().await.map_err(classify)
    }
}

#[async_trait]
impl SpawnRepository for SqliteStore {
    async fn spawn(&self, id: &str) -> StoreResult<Option<SpawnInstance>> {
        let row: Option<SpawnRow> = sqlx::query_as(&format!("SELECT {SPAWN_COLUMNS} FROM spawn WHERE id = ?1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| StoreError::classify(e, "Loading spawn"))?;
        row.map(SpawnInstance::try_from).transpose()
    }

    async fn active(&self, branch_id: &str, now: DateTime<Utc>) -> StoreResult<Vec<SpawnInstance>> {
        let rows: Vec<SpawnRow> = sqlx::query_as(&format!(
            "SELECT {SPAWN_COLUMNS} FROM spawn WHERE branch_id = ?1 AND expires_at > ?2 ORDER BY created_at, id"
        ))
        .bind(branch_id)
        .bind(now.timestamp_millis())
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| StoreError::classify(e, "Reading active spawns"))?;
        convert(rows)
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

        let classify = |e: sqlx::Error| StoreError::classify(e, "Replenishing branch");
        // Takes the write lock up front so the count below cannot go stale.
        let mut tx = self.db.begin_with("BEGIN IMMEDIATE").await.map_err(classify)?;

        let mut accepted = Vec::with_capacity(fresh.len());
        for spawn in fresh {
            let inserted = sqlx::query(INSERT_IF_ROOM)
                .bind(&spawn.id)
                .bind(branch_id)
                .bind(&spawn.species_id)
                .bind(spawn.expires_at.timestamp_millis())
                .bind(spawn.created_at.timestamp_millis())
                .bind(now.timestamp_millis())
                .bind(i64::from(capacity))
                .execute(&mut *tx)
                .await
                .map_err(classify)?
                .rows_affected();
            if inserted == 0 {
                trace!(branch_id, dropped = fresh.len() - accepted.len(), "Branch full, truncating");
                break;
            }
            accepted.push(spawn.clone());
        }

        tx.commit().await.map_err(classify)?;
        Ok(accepted)
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM spawn WHERE expires_at <= ?1 AND id NOT IN (SELECT spawn_id FROM bag_entry)",
        )
        .bind(cutoff.timestamp_millis())
        .execute(self.db.pool())
        .await
        .map_err(|e| StoreError::classify(e, "Sweeping spawns"))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BagRepository for SqliteStore {
    async fn insert(&self, entry: &BagEntry) -> StoreResult<()> {
        sqlx::query(&format!("INSERT INTO bag_entry ({BAG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"))
            .bind(&entry.id)
            .bind(&entry.player_id)
            .bind(&entry.spawn_id)
            .bind(entry.delivered)
            .bind(entry.created_at.timestamp_millis())
            .bind(entry.updated_at.timestamp_millis())
            .execute(self.db.pool())
            .await
            .map_err(|e| {
                if fauna_database::is_unique_violation(&e) {
                    StoreError::Duplicate { what: "claim".into(), context: Some(entry.spawn_id.clone().into()) }
                } else {
                    StoreError::classify(e, "Inserting bag entry")
                }
            })?;
        Ok(())
    }

    async fn entry(&self, id: &str) -> StoreResult<Option<BagEntry>> {
        let row: Option<BagRow> = sqlx::query_as(&format!("SELECT {BAG_COLUMNS} FROM bag_entry WHERE id = ?1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| StoreError::classify(e, "Loading bag entry"))?;
        row.map(BagEntry::try_from).transpose()
    }

    async fn views(&self, player_id: &str) -> StoreResult<Vec<BagView>> {
        let rows = sqlx::query(BAG_VIEWS)
            .bind(player_id)
            .fetch_all(self.db.pool())
            .await
            .map_err(|e| StoreError::classify(e, "Listing bag"))?;

        rows.iter()
            .map(bag_view)
            .collect::<Result<_, _>>()
            .map_err(|e| StoreError::classify(e, "Decoding bag"))
    }

    async fn mark_delivered(&self, id: &str, now: DateTime<Utc>) -> StoreResult<Option<BagEntry>> {
        sqlx::query("UPDATE bag_entry SET delivered = 1, updated_at = ?2 WHERE id = ?1 AND delivered = 0")
            .bind(id)
            .bind(now.timestamp_millis())
            .execute(self.db.pool())
            .await
            .map_err(|e| StoreError::classify(e, "Releasing bag entry"))?;
        self.entry(id).await
    }
}
