//! # Database Infrastructure
//!
//! Opens the `SQLite` pool shared by every feature slice and applies their
//! versioned migrations.
//!
//! ## Key Features
//! - **File or memory**: `sqlite://fauna.db` and `sqlite::memory:` URLs.
//! - **Resilient Connectivity**: health probes retried with exponential backoff.
//! - **Checksummed migrations**: scripts already applied must not change.
//!
//! ## Example
//!
//! ```rust
//! use fauna_database::{Database, DatabaseError, Migration};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), DatabaseError> {
//!     let db = Database::builder()
//!         .url("sqlite::memory:")
//!         .migrations([Migration::new("demo", "0001", "CREATE TABLE demo (id TEXT)")])
//!         .init()
//!         .await?;
//!
//!     db.ping().await?;
//!     Ok(())
//! }
//! ```

mod error;
mod migrations;

pub use error::{DatabaseError, DatabaseErrorExt};
pub use migrations::{Migration, MigrationReport};

use fauna_domain::config::DatabaseConfig;
use migrations::MigrationRunner;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, trace, warn};

const HEALTH_ATTEMPTS: u32 = 3;

// Primary result codes, extended codes keep them in the low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

#[derive(Debug)]
pub struct DatabaseInner {
    pool: SqlitePool,
    url: String,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        info!(url = %self.url, "SQLite pool handle dropped");
    }
}

/// Cheaply clonable handle to the `SQLite` pool.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Runs a trivial query against the pool.
    ///
    /// # Errors
    /// Returns [`DatabaseError::Sqlx`] when the store does not answer.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.inner.pool).await.context("Health probe")?;
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.inner.pool
    }
}

/// `true` when the error is a `UNIQUE` or `PRIMARY KEY` constraint violation.
#[must_use]
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// `true` when `SQLite` refused the statement because another writer holds the lock.
///
/// Pool exhaustion is not contention: an unavailable store must not be retried.
#[must_use]
pub fn is_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().is_some_and(|code| is_contention_code(&code)),
        _ => false,
    }
}

/// Primary result code check on a raw `SQLite` code such as `"5"` or `"517"`.
fn is_contention_code(code: &str) -> bool {
    code.parse::<i32>().is_ok_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
}

/// A fluent builder for opening the pool and migrating the schema.
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug)]
pub struct DatabaseBuilder {
    url: Option<String>,
    max_connections: u32,
    busy_timeout: Duration,
    migrations: Vec<Migration>,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            url: None,
            max_connections: defaults.max_connections,
            busy_timeout: Duration::from_millis(defaults.busy_timeout_ms),
            migrations: Vec::new(),
        }
    }
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies URL, pool size and busy timeout from the configuration section.
    pub fn config(self, config: &DatabaseConfig) -> Self {
        self.url(&config.url)
            .max_connections(config.max_connections)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub const fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// How long a statement waits on a locked database before failing with `SQLITE_BUSY`.
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Appends migrations; they run in the order given.
    pub fn migrations(mut self, migrations: impl IntoIterator<Item = Migration>) -> Self {
        self.migrations.extend(migrations);
        self
    }

    /// Opens the pool, waits for it to become healthy and applies pending migrations.
    ///
    /// In-memory databases are pinned to a single long-lived connection, so every
    /// caller sees the same data for the lifetime of the handle.
    ///
    /// # Errors
    /// * [`DatabaseError::Validation`] if the URL is missing or malformed.
    /// * [`DatabaseError::Connection`] if the store stays unhealthy.
    /// * [`DatabaseError::Migration`] / [`DatabaseError::Sqlx`] if a migration fails.
    #[instrument(skip(self), fields(url = self.url))]
    pub async fn init(self) -> Result<Database, DatabaseError> {
        let url = self.url.ok_or(DatabaseError::Validation {
            message: "URL is required".into(),
            context: None,
        })?;

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let mut options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DatabaseError::Validation {
                message: e.to_string().into(),
                context: Some(url.clone().into()),
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(self.max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            DatabaseError::Connection {
                message: e.to_string().into(),
                context: Some("Opening pool".into()),
            }
        })?;

        let mut delay = Duration::from_millis(100);
        for attempt in 1..=HEALTH_ATTEMPTS {
            if sqlx::query("SELECT 1").execute(&pool).await.is_ok() {
                break;
            }
            if attempt == HEALTH_ATTEMPTS {
                return Err(DatabaseError::Connection {
                    message: "Unhealthy after retries".into(),
                    context: Some(url.into()),
                });
            }
            warn!(attempt, ?delay, "Database not ready, retrying...");
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
        info!(in_memory, "SQLite pool established");

        let report = MigrationRunner::new(&pool).run(&self.migrations).await?;
        for skipped in &report.skipped {
            trace!(migration = %skipped, "Skipping migration");
        }
        for applied in &report.applied {
            info!(migration = %applied, "Applied migration");
        }

        Ok(Database { inner: Arc::new(DatabaseInner { pool, url }) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_codes_keep_their_primary_code() {
        assert!(is_contention_code("5"));
        assert!(is_contention_code("6"));
        // SQLITE_BUSY_SNAPSHOT
        assert!(is_contention_code("517"));
        // SQLITE_CONSTRAINT_UNIQUE
        assert!(!is_contention_code("2067"));
        assert!(!is_contention_code("busy"));
    }
}
