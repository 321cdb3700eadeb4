//! SQLite implementation of the PatternRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{format_timestamp, parse_datetime, parse_json, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{LearningPattern, OutcomeTotals, PatternKind};
use crate::domain::ports::PatternRepository;

#[derive(Clone)]
pub struct SqlitePatternRepository {
    pool: SqlitePool,
}

impl SqlitePatternRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PatternRow {
    id: String,
    kind: String,
    issue_characteristics_json: String,
    solution_approach_json: String,
    issue_features_json: String,
    vocabulary_version: i64,
    confidence: f64,
    success_rate: f64,
    usage_count: i64,
    created_at: String,
}

impl TryFrom<PatternRow> for LearningPattern {
    type Error = DomainError;

    fn try_from(row: PatternRow) -> Result<Self, Self::Error> {
        let kind: PatternKind = row.kind.parse().map_err(DomainError::SerializationError)?;

        Ok(LearningPattern {
            id: parse_uuid(&row.id)?,
            kind,
            issue_characteristics: parse_json(&row.issue_characteristics_json, "issue_characteristics")?,
            solution_approach: parse_json(&row.solution_approach_json, "solution_approach")?,
            issue_features: parse_json(&row.issue_features_json, "issue_features")?,
            vocabulary_version: row.vocabulary_version as u32,
            confidence: row.confidence,
            success_rate: row.success_rate,
            usage_count: row.usage_count as u64,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

fn rows_to_patterns(rows: Vec<PatternRow>) -> DomainResult<Vec<LearningPattern>> {
    rows.into_iter().map(LearningPattern::try_from).collect()
}

#[async_trait]
impl PatternRepository for SqlitePatternRepository {
    async fn insert(&self, pattern: &LearningPattern) -> DomainResult<()> {
        if !(0.0..=1.0).contains(&pattern.confidence) {
            return Err(DomainError::ValidationFailed(format!(
                "confidence {} outside [0, 1]",
                pattern.confidence
            )));
        }

        let characteristics_json = serde_json::to_string(&pattern.issue_characteristics)?;
        let solution_json = serde_json::to_string(&pattern.solution_approach)?;
        let features_json = serde_json::to_string(&pattern.issue_features)?;

        sqlx::query(
            r#"INSERT INTO learning_patterns
               (id, kind, issue_characteristics_json, solution_approach_json, issue_features_json,
                vocabulary_version, confidence, success_rate, usage_count, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(pattern.id.to_string())
        .bind(pattern.kind.as_str())
        .bind(&characteristics_json)
        .bind(&solution_json)
        .bind(&features_json)
        .bind(i64::from(pattern.vocabulary_version))
        .bind(pattern.confidence)
        .bind(pattern.success_rate)
        .bind(pattern.usage_count.max(1) as i64)
        .bind(format_timestamp(pattern.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<LearningPattern>> {
        let row: Option<PatternRow> = sqlx::query_as("SELECT * FROM learning_patterns WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(LearningPattern::try_from).transpose()
    }

    async fn top_successful(&self, limit: usize) -> DomainResult<Vec<LearningPattern>> {
        let rows: Vec<PatternRow> = sqlx::query_as(
            r#"SELECT * FROM learning_patterns
               WHERE kind = 'success'
               ORDER BY success_rate DESC, usage_count DESC, created_at DESC
               LIMIT ?"#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows_to_patterns(rows)
    }

    async fn created_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> DomainResult<Vec<LearningPattern>> {
        let rows: Vec<PatternRow> = sqlx::query_as(
            r#"SELECT * FROM learning_patterns
               WHERE created_at >= ?
               ORDER BY created_at ASC, rowid ASC
               LIMIT ?"#,
        )
        .bind(format_timestamp(since))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows_to_patterns(rows)
    }

    async fn recent(&self, limit: usize) -> DomainResult<Vec<LearningPattern>> {
        let rows: Vec<PatternRow> = sqlx::query_as(
            r#"SELECT id, kind, issue_characteristics_json, solution_approach_json,
                      issue_features_json, vocabulary_version, confidence, success_rate,
                      usage_count, created_at
               FROM (
                   SELECT rowid AS seq, * FROM learning_patterns
                   ORDER BY created_at DESC, rowid DESC
                   LIMIT ?
               )
               ORDER BY created_at ASC, seq ASC"#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows_to_patterns(rows)
    }

    async fn outcome_totals(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DomainResult<OutcomeTotals> {
        let (completed, failed, duration_ms): (i64, i64, i64) = sqlx::query_as(
            r#"SELECT COALESCE(SUM(kind = 'success'), 0),
                      COALESCE(SUM(kind = 'failure'), 0),
                      COALESCE(SUM(CAST(json_extract(solution_approach_json, '$.duration_ms') AS INTEGER)), 0)
               FROM learning_patterns
               WHERE created_at >= ? AND created_at < ?"#,
        )
        .bind(format_timestamp(since))
        .bind(format_timestamp(until))
        .fetch_one(&self.pool)
        .await?;

        Ok(OutcomeTotals {
            completed: completed.max(0) as u64,
            failed: failed.max(0) as u64,
            duration_ms: duration_ms.max(0) as u64,
        })
    }

    async fn increment_usage(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("UPDATE learning_patterns SET usage_count = usage_count + 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::PatternNotFound(id));
        }
        Ok(())
    }

    async fn count(&self) -> DomainResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM learning_patterns")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
