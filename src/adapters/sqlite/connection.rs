//! SQLite connection pools for the engine store.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::DatabaseConfig;

/// Writers wait this long for the lock before failing with `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to open database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("Database did not answer: {0}")]
    Ping(#[source] sqlx::Error),
}

/// Open a file-backed pool, creating the file and its parent directory when
/// missing. The store runs in WAL mode so readers never block the writer.
pub async fn open_pool(config: &DatabaseConfig) -> Result<SqlitePool, ConnectionError> {
    let path = config.path.strip_prefix("sqlite:").unwrap_or(&config.path);
    ensure_parent_dir(Path::new(path))?;

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .min_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(|source| ConnectionError::Open {
            path: path.to_string(),
            source,
        })?;

    tracing::debug!(path, max_connections = config.max_connections, "Database pool ready");
    Ok(pool)
}

/// Single-connection in-memory pool; every call yields an isolated database.
pub async fn open_in_memory() -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .synchronous(SqliteSynchronous::Normal);

    // One connection that never expires: closing it would drop the database.
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|source| ConnectionError::Open {
            path: ":memory:".to_string(),
            source,
        })
}

fn ensure_parent_dir(path: &Path) -> Result<(), ConnectionError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|source| ConnectionError::CreateDirectory {
        path: parent.to_path_buf(),
        source,
    })
}

pub async fn ping(pool: &SqlitePool) -> Result<(), ConnectionError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(ConnectionError::Ping)?;
    Ok(())
}
