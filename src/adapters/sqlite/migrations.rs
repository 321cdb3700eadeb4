//! Versioned schema migrations embedded in the binary.

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;

use super::format_timestamp;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration {version} ({description}) failed: {source}")]
    Apply {
        version: i64,
        description: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to read schema version: {0}")]
    Version(#[source] sqlx::Error),
    #[error("Database schema version {found} is newer than this build supports ({supported})")]
    UnknownVersion { found: i64, supported: i64 },
}

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Every migration this build knows, oldest first.
pub const EMBEDDED_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "learning, telemetry and tuning schema",
    sql: include_str!("../../../migrations/001_initial_schema.sql"),
}];

fn latest_version() -> i64 {
    EMBEDDED_MIGRATIONS.last().map_or(0, |m| m.version)
}

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply every embedded migration newer than the stored version, each in
    /// its own transaction. Returns the versions applied.
    pub async fn run(&self) -> Result<Vec<i64>, MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(MigrationError::Version)?;

        let current = self.current_version().await?;
        if current > latest_version() {
            return Err(MigrationError::UnknownVersion {
                found: current,
                supported: latest_version(),
            });
        }

        let mut applied = Vec::new();
        for migration in EMBEDDED_MIGRATIONS.iter().filter(|m| m.version > current) {
            self.apply(migration).await?;
            tracing::info!(version = migration.version, description = migration.description, "Applied migration");
            applied.push(migration.version);
        }
        Ok(applied)
    }

    pub async fn current_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(MigrationError::Version)?;
        Ok(version)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        let fail = |source| MigrationError::Apply {
            version: migration.version,
            description: migration.description,
            source,
        };

        let mut tx = self.pool.begin().await.map_err(fail)?;
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await.map_err(fail)?;
        sqlx::query("INSERT INTO schema_migrations (version, description, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .bind(format_timestamp(Utc::now()))
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        tx.commit().await.map_err(fail)
    }
}
