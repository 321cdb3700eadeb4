//! SQLite implementation of the TelemetryRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::adapters::sqlite::{format_timestamp, parse_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{MetricType, TelemetrySample};
use crate::domain::ports::TelemetryRepository;

#[derive(Clone)]
pub struct SqliteTelemetryRepository {
    pool: SqlitePool,
}

impl SqliteTelemetryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SampleRow {
    metric_type: String,
    value: f64,
    recorded_at: String,
}

impl TryFrom<SampleRow> for TelemetrySample {
    type Error = DomainError;

    fn try_from(row: SampleRow) -> Result<Self, Self::Error> {
        Ok(TelemetrySample {
            metric: row
                .metric_type
                .parse()
                .map_err(DomainError::SerializationError)?,
            value: row.value,
            recorded_at: parse_datetime(&row.recorded_at)?,
        })
    }
}

#[async_trait]
impl TelemetryRepository for SqliteTelemetryRepository {
    async fn record(&self, samples: &[TelemetrySample]) -> DomainResult<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for sample in samples {
            if !sample.value.is_finite() {
                tracing::warn!(metric = %sample.metric, "Dropping non-finite telemetry sample");
                continue;
            }
            sqlx::query("INSERT INTO telemetry_samples (metric_type, value, recorded_at) VALUES (?, ?, ?)")
                .bind(sample.metric.as_str())
                .bind(sample.value)
                .bind(format_timestamp(sample.recorded_at))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn samples_since(
        &self,
        metric: MetricType,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<TelemetrySample>> {
        let rows: Vec<SampleRow> = sqlx::query_as(
            r#"SELECT metric_type, value, recorded_at FROM telemetry_samples
               WHERE metric_type = ? AND recorded_at >= ?
               ORDER BY recorded_at ASC, id ASC"#,
        )
        .bind(metric.as_str())
        .bind(format_timestamp(since))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TelemetrySample::try_from).collect()
    }

    async fn prune_before(&self, before: DateTime<Utc>) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM telemetry_samples WHERE recorded_at < ?")
            .bind(format_timestamp(before))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
