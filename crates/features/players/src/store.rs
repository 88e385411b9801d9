//! In-memory and `SQLite` player repositories.

use crate::model::Player;
use crate::repository::{PlayerRepository, PlayerStoreError};
use async_trait::async_trait;
use chrono::DateTime;
use fauna_database::Database;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use sqlx::FromRow;

#[derive(Debug, Default)]
pub struct MemoryPlayers {
    by_email: RwLock<FxHashMap<String, Player>>,
}

#[async_trait]
impl PlayerRepository for MemoryPlayers {
    async fn insert(&self, player: &Player) -> Result<(), PlayerStoreError> {
        let mut players = self.by_email.write();
        if players.contains_key(&player.email) {
            return Err(PlayerStoreError::Duplicate { context: Some(player.email.clone().into()) });
        }
        players.insert(player.email.clone(), player.clone());
        Ok(())
    }

    async fn by_email(&self, email: &str) -> Result<Option<Player>, PlayerStoreError> {
        Ok(self.by_email.read().get(email).cloned())
    }

    async fn by_id(&self, id: &str) -> Result<Option<Player>, PlayerStoreError> {
        Ok(self.by_email.read().values().find(|p| p.id == id).cloned())
    }
}

#[derive(FromRow)]
struct PlayerRow {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    created_at: i64,
}

impl TryFrom<PlayerRow> for Player {
    type Error = PlayerStoreError;

    fn try_from(row: PlayerRow) -> Result<Self, Self::Error> {
        let created_at = DateTime::from_timestamp_millis(row.created_at).ok_or_else(|| PlayerStoreError::Corrupt {
            message: format!("timestamp {} out of range", row.created_at).into(),
            context: Some(row.id.clone().into()),
        })?;
        Ok(Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            created_at,
        })
    }
}

const PLAYER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, created_at";

#[derive(Debug, Clone)]
pub struct SqlitePlayers {
    db: Database,
}

impl SqlitePlayers {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    async fn find(&self, column: &str, value: &str) -> Result<Option<Player>, PlayerStoreError> {
        let row: Option<PlayerRow> =
            sqlx::query_as(&format!("SELECT {PLAYER_COLUMNS} FROM player WHERE {column} = ?1"))
                .bind(value)
                .fetch_optional(self.db.pool())
                .await
                .map_err(|source| PlayerStoreError::Sqlx { source, context: Some("Loading player".into()) })?;
        row.map(Player::try_from).transpose()
    }
}

#[async_trait]
impl PlayerRepository for SqlitePlayers {
    async fn insert(&self, player: &Player) -> Result<(), PlayerStoreError> {
        sqlx::query(&format!("INSERT INTO player ({PLAYER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"))
            .bind(&player.id)
            .bind(&player.first_name)
            .bind(&player.last_name)
            .bind(&player.email)
            .bind(&player.password_hash)
            .bind(player.created_at.timestamp_millis())
            .execute(self.db.pool())
            .await
            .map_err(|source| {
                if fauna_database::is_unique_violation(&source) {
                    PlayerStoreError::Duplicate { context: Some(player.email.clone().into()) }
                } else {
                    PlayerStoreError::Sqlx { source, context: Some("Inserting player".into()) }
                }
            })?;
        Ok(())
    }

    async fn by_email(&self, email: &str) -> Result<Option<Player>, PlayerStoreError> {
        self.find("email", email).await
    }

    async fn by_id(&self, id: &str) -> Result<Option<Player>, PlayerStoreError> {
        self.find("id", id).await
    }
}
