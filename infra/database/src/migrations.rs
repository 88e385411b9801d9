use crate::error::{DatabaseError, DatabaseErrorExt};
use fxhash::FxHashMap;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

const LEDGER: &str = "CREATE TABLE IF NOT EXISTS _migration (
    slice TEXT NOT NULL,
    version TEXT NOT NULL,
    checksum TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    PRIMARY KEY (slice, version)
)";

/// A versioned SQL script owned by a feature slice.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub slice: &'static str,
    pub version: &'static str,
    pub script: &'static str,
}

impl Migration {
    #[must_use]
    pub const fn new(slice: &'static str, version: &'static str, script: &'static str) -> Self {
        Self { slice, version, script }
    }

    /// Hex encoded SHA-256 of the script.
    #[must_use]
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.script.as_bytes()))
    }

    fn key(&self) -> String {
        format!("{}:{}", self.slice, self.version)
    }
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct AppliedMigration {
    slice: String,
    version: String,
    checksum: String,
}

/// Applies pending migrations in order, each inside its own transaction.
#[derive(Debug)]
pub(crate) struct MigrationRunner<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MigrationRunner<'a> {
    pub(crate) const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) async fn run(&self, migrations: &[Migration]) -> Result<MigrationReport, DatabaseError> {
        sqlx::query(LEDGER).execute(self.pool).await.context("Creating migration ledger")?;

        let applied = self.applied().await?;
        let mut report = MigrationReport::default();

        for migration in migrations {
            let checksum = migration.checksum();
            if let Some(existing) = applied.get(&migration.key()) {
                ensure_checksum_match(migration, &existing.checksum, &checksum)?;
                report.skipped.push(migration.key());
                continue;
            }

            self.apply(migration, &checksum).await?;
            report.applied.push(migration.key());
        }

        Ok(report)
    }

    async fn applied(&self) -> Result<FxHashMap<String, AppliedMigration>, DatabaseError> {
        let rows = sqlx::query_as::<_, AppliedMigration>(
            "SELECT slice, version, checksum FROM _migration",
        )
        .fetch_all(self.pool)
        .await
        .context("Loading applied migrations")?;

        Ok(rows.into_iter().map(|row| (format!("{}:{}", row.slice, row.version), row)).collect())
    }

    async fn apply(&self, migration: &Migration, checksum: &str) -> Result<(), DatabaseError> {
        let failed_at = || format!("SQL execution failed at {}", migration.key());

        let mut tx = self.pool.begin().await.context("Opening migration transaction")?;
        sqlx::raw_sql(migration.script).execute(&mut *tx).await.context(failed_at())?;
        sqlx::query(
            "INSERT INTO _migration (slice, version, checksum, applied_at) VALUES (?, ?, ?, ?)",
        )
        .bind(migration.slice)
        .bind(migration.version)
        .bind(checksum)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await
        .context(failed_at())?;
        tx.commit().await.context(failed_at())?;

        Ok(())
    }
}

fn ensure_checksum_match(
    migration: &Migration,
    existing: &str,
    current: &str,
) -> Result<(), DatabaseError> {
    if existing != current {
        return Err(DatabaseError::Migration {
            message: format!(
                "Checksum mismatch for {} (recorded {existing}, found {current})",
                migration.key()
            )
            .into(),
            context: Some("Migration already applied with different contents".into()),
        });
    }
    Ok(())
}
