//! Deletes rolled log files past their retention age.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tracing::{debug, info};

use super::logger::LOG_FILE_NAME;

/// Remove files in `log_dir` named after the log file (`autoresolve.log`,
/// `autoresolve.log.2026-10-18`, ...) whose modification time is older than
/// `retention_days`. Other files are never touched. Returns the count removed.
pub async fn prune_expired_logs(log_dir: impl AsRef<Path>, retention_days: u32) -> Result<usize> {
    let log_dir = log_dir.as_ref();
    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
    let mut entries = tokio::fs::read_dir(log_dir)
        .await
        .with_context(|| format!("failed to read log directory {}", log_dir.display()))?;

    let mut deleted = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .context("failed to read log directory entry")?
    {
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_NAME));
        if !is_log {
            continue;
        }

        let metadata = entry.metadata().await.context("failed to read log file metadata")?;
        if !metadata.is_file() {
            continue;
        }
        let modified: DateTime<Utc> = metadata
            .modified()
            .context("failed to read log file modification time")?
            .into();

        if modified < cutoff {
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("failed to delete {}", path.display()))?;
            debug!(path = %path.display(), "deleted expired log file");
            deleted += 1;
        }
    }

    if deleted > 0 {
        info!(count = deleted, retention_days, "pruned expired log files");
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, FileTimes};
    use std::time::{Duration as StdDuration, SystemTime};
    use tempfile::TempDir;

    fn backdate(path: &Path, days: u64) {
        let when = SystemTime::now() - StdDuration::from_secs(days * 24 * 3600);
        let file = File::options().write(true).open(path).unwrap();
        file.set_times(FileTimes::new().set_modified(when)).unwrap();
    }

    #[tokio::test]
    async fn test_prunes_only_expired_log_files() {
        let dir = TempDir::new().unwrap();
        let old_log = dir.path().join(format!("{LOG_FILE_NAME}.2026-01-01"));
        let fresh_log = dir.path().join(format!("{LOG_FILE_NAME}.2026-10-17"));
        let old_other = dir.path().join("notes.txt");
        for path in [&old_log, &fresh_log, &old_other] {
            std::fs::write(path, b"{}").unwrap();
        }
        backdate(&old_log, 40);
        backdate(&old_other, 40);

        let deleted = prune_expired_logs(dir.path(), 30).await.unwrap();

        assert_eq!(deleted, 1);
        assert!(!old_log.exists());
        assert!(fresh_log.exists());
        assert!(old_other.exists());
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(prune_expired_logs(&missing, 30).await.unwrap(), 0);
    }
}
