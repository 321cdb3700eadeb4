//! SQLite implementation of the SelectionRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{format_timestamp, parse_datetime, parse_json, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::SelectionRecord;
use crate::domain::ports::SelectionRepository;

#[derive(Clone)]
pub struct SqliteSelectionRepository {
    pool: SqlitePool,
}

impl SqliteSelectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SelectionRow {
    id: String,
    issue_characteristics_json: String,
    tools_json: String,
    agents_json: String,
    confidence: Option<f64>,
    created_at: String,
}

impl TryFrom<SelectionRow> for SelectionRecord {
    type Error = DomainError;

    fn try_from(row: SelectionRow) -> Result<Self, Self::Error> {
        Ok(SelectionRecord {
            id: parse_uuid(&row.id)?,
            issue_characteristics: parse_json(&row.issue_characteristics_json, "issue_characteristics")?,
            tools: parse_json(&row.tools_json, "tools")?,
            agents: parse_json(&row.agents_json, "agents")?,
            confidence: row.confidence,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[async_trait]
impl SelectionRepository for SqliteSelectionRepository {
    async fn save(&self, record: &SelectionRecord) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO tool_selections
               (id, issue_characteristics_json, tools_json, agents_json, confidence, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(serde_json::to_string(&record.issue_characteristics)?)
        .bind(serde_json::to_string(&record.tools)?)
        .bind(serde_json::to_string(&record.agents)?)
        .bind(record.confidence)
        .bind(format_timestamp(record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<SelectionRecord>> {
        let row: Option<SelectionRow> = sqlx::query_as("SELECT * FROM tool_selections WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(SelectionRecord::try_from).transpose()
    }

    async fn recent(&self, limit: usize) -> DomainResult<Vec<SelectionRecord>> {
        let rows: Vec<SelectionRow> =
            sqlx::query_as("SELECT * FROM tool_selections ORDER BY created_at DESC LIMIT ?")
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(SelectionRecord::try_from).collect()
    }
}
