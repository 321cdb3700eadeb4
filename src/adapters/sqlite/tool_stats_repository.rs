//! SQLite implementation of the ToolStatsRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::adapters::sqlite::{format_timestamp, parse_optional_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ToolCategory, ToolDefinition, ToolUsageStat};
use crate::domain::ports::ToolStatsRepository;

#[derive(Clone)]
pub struct SqliteToolStatsRepository {
    pool: SqlitePool,
}

impl SqliteToolStatsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ToolStatRow {
    name: String,
    category: String,
    success_rate: f64,
    performance_score: f64,
    usage_count: i64,
    last_used_at: Option<String>,
}

impl TryFrom<ToolStatRow> for ToolUsageStat {
    type Error = DomainError;

    fn try_from(row: ToolStatRow) -> Result<Self, Self::Error> {
        let category: ToolCategory = row
            .category
            .parse()
            .map_err(DomainError::SerializationError)?;

        Ok(ToolUsageStat {
            name: row.name,
            category,
            success_rate: row.success_rate,
            performance_score: row.performance_score,
            usage_count: row.usage_count.max(0) as u64,
            last_used_at: parse_optional_datetime(row.last_used_at)?,
        })
    }
}

#[async_trait]
impl ToolStatsRepository for SqliteToolStatsRepository {
    async fn seed(&self, catalog: &[ToolDefinition]) -> DomainResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut created = 0usize;

        for definition in catalog {
            let stat = ToolUsageStat::seed(definition);
            let result = sqlx::query(
                r#"INSERT OR IGNORE INTO tool_usage_stats
                   (name, category, success_rate, performance_score, usage_count, last_used_at)
                   VALUES (?, ?, ?, ?, 0, NULL)"#,
            )
            .bind(&stat.name)
            .bind(stat.category.as_str())
            .bind(stat.success_rate)
            .bind(stat.performance_score)
            .execute(&mut *tx)
            .await?;
            created += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn get(&self, name: &str) -> DomainResult<Option<ToolUsageStat>> {
        let row: Option<ToolStatRow> = sqlx::query_as("SELECT * FROM tool_usage_stats WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ToolUsageStat::try_from).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<ToolUsageStat>> {
        let rows: Vec<ToolStatRow> = sqlx::query_as("SELECT * FROM tool_usage_stats ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ToolUsageStat::try_from).collect()
    }

    async fn record_usage(&self, names: &[String], at: DateTime<Utc>) -> DomainResult<()> {
        if names.is_empty() {
            return Ok(());
        }

        let at = format_timestamp(at);
        let mut tx = self.pool.begin().await?;
        for name in names {
            let result = sqlx::query(
                "UPDATE tool_usage_stats SET usage_count = usage_count + 1, last_used_at = ? WHERE name = ?",
            )
            .bind(&at)
            .bind(name)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tracing::debug!(tool = %name, "Usage recorded for tool without statistics row");
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert(&self, stat: &ToolUsageStat) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO tool_usage_stats
               (name, category, success_rate, performance_score, usage_count, last_used_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(name) DO UPDATE SET
                   category = excluded.category,
                   success_rate = excluded.success_rate,
                   performance_score = excluded.performance_score,
                   usage_count = excluded.usage_count,
                   last_used_at = excluded.last_used_at"#,
        )
        .bind(&stat.name)
        .bind(stat.category.as_str())
        .bind(stat.success_rate.clamp(0.0, 1.0))
        .bind(stat.performance_score.clamp(0.0, 1.0))
        .bind(stat.usage_count as i64)
        .bind(stat.last_used_at.map(format_timestamp))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
