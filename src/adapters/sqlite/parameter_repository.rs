//! SQLite implementation of the ParameterRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::adapters::sqlite::{format_timestamp, parse_datetime, parse_json, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AdjustmentDirection, AdjustmentRecord, AdjustmentStatus, OptimizationParameter,
    ParameterAdjustment,
};
use crate::domain::ports::ParameterRepository;

#[derive(Clone)]
pub struct SqliteParameterRepository {
    pool: SqlitePool,
}

impl SqliteParameterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ParameterRow {
    category: String,
    name: String,
    current_value: f64,
    min_value: f64,
    max_value: f64,
    optimal_value: f64,
    signals_json: String,
    updated_at: String,
}

impl TryFrom<ParameterRow> for OptimizationParameter {
    type Error = DomainError;

    fn try_from(row: ParameterRow) -> Result<Self, Self::Error> {
        Ok(OptimizationParameter {
            category: row.category,
            name: row.name,
            current_value: row.current_value,
            min: row.min_value,
            max: row.max_value,
            optimal: row.optimal_value,
            signals: parse_json(&row.signals_json, "signals")?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: String,
    category: String,
    name: String,
    previous_value: f64,
    proposed_value: f64,
    score: f64,
    direction: String,
    status: String,
    error: Option<String>,
    recorded_at: String,
}

fn parse_direction(s: &str) -> DomainResult<AdjustmentDirection> {
    match s {
        "increase" => Ok(AdjustmentDirection::Increase),
        "decrease" => Ok(AdjustmentDirection::Decrease),
        other => Err(DomainError::SerializationError(format!(
            "unknown adjustment direction: {other}"
        ))),
    }
}

const fn direction_str(direction: AdjustmentDirection) -> &'static str {
    match direction {
        AdjustmentDirection::Increase => "increase",
        AdjustmentDirection::Decrease => "decrease",
    }
}

impl TryFrom<HistoryRow> for AdjustmentRecord {
    type Error = DomainError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let status: AdjustmentStatus = row
            .status
            .parse()
            .map_err(DomainError::SerializationError)?;

        Ok(AdjustmentRecord {
            id: parse_uuid(&row.id)?,
            adjustment: ParameterAdjustment {
                category: row.category,
                name: row.name,
                previous_value: row.previous_value,
                proposed_value: row.proposed_value,
                score: row.score,
                direction: parse_direction(&row.direction)?,
            },
            status,
            error: row.error,
            recorded_at: parse_datetime(&row.recorded_at)?,
        })
    }
}

#[async_trait]
impl ParameterRepository for SqliteParameterRepository {
    async fn seed(&self, parameters: &[OptimizationParameter]) -> DomainResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut created = 0usize;

        for p in parameters {
            let signals_json = serde_json::to_string(&p.signals)?;
            let result = sqlx::query(
                r#"INSERT OR IGNORE INTO optimization_parameters
                   (category, name, current_value, min_value, max_value, optimal_value, signals_json, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&p.category)
            .bind(&p.name)
            .bind(p.clamp(p.current_value))
            .bind(p.min)
            .bind(p.max)
            .bind(p.clamp(p.optimal))
            .bind(&signals_json)
            .bind(format_timestamp(p.updated_at))
            .execute(&mut *tx)
            .await?;
            created += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn get(&self, category: &str, name: &str) -> DomainResult<Option<OptimizationParameter>> {
        let row: Option<ParameterRow> = sqlx::query_as(
            "SELECT * FROM optimization_parameters WHERE category = ? AND name = ?",
        )
        .bind(category)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OptimizationParameter::try_from).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<OptimizationParameter>> {
        let rows: Vec<ParameterRow> =
            sqlx::query_as("SELECT * FROM optimization_parameters ORDER BY category, name")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(OptimizationParameter::try_from).collect()
    }

    async fn update_value(&self, category: &str, name: &str, value: f64) -> DomainResult<()> {
        let key = format!("{category}.{name}");
        let existing = self
            .get(category, name)
            .await?
            .ok_or_else(|| DomainError::ParameterNotFound(key.clone()))?;

        if !value.is_finite() || value < existing.min || value > existing.max {
            return Err(DomainError::ParameterOutOfBounds {
                key,
                value,
                min: existing.min,
                max: existing.max,
            });
        }

        sqlx::query(
            "UPDATE optimization_parameters SET current_value = ?, updated_at = ? WHERE category = ? AND name = ?",
        )
        .bind(value)
        .bind(format_timestamp(Utc::now()))
        .bind(category)
        .bind(name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_adjustment(&self, record: &AdjustmentRecord) -> DomainResult<()> {
        let adj = &record.adjustment;
        sqlx::query(
            r#"INSERT INTO optimization_history
               (id, category, name, previous_value, proposed_value, score, direction, status, error, recorded_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(&adj.category)
        .bind(&adj.name)
        .bind(adj.previous_value)
        .bind(adj.proposed_value)
        .bind(adj.score)
        .bind(direction_str(adj.direction))
        .bind(record.status.as_str())
        .bind(&record.error)
        .bind(format_timestamp(record.recorded_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_adjustments(&self, limit: usize) -> DomainResult<Vec<AdjustmentRecord>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            "SELECT * FROM optimization_history ORDER BY recorded_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AdjustmentRecord::try_from).collect()
    }
}
