//! Repository port for per-tool usage statistics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{ToolDefinition, ToolUsageStat};

#[async_trait]
pub trait ToolStatsRepository: Send + Sync {
    /// Insert neutral statistics for every catalog tool that has none yet.
    /// Returns the number of rows created.
    async fn seed(&self, catalog: &[ToolDefinition]) -> DomainResult<usize>;

    async fn get(&self, name: &str) -> DomainResult<Option<ToolUsageStat>>;

    /// All statistics ordered by name.
    async fn list(&self) -> DomainResult<Vec<ToolUsageStat>>;

    /// Increment `usage_count` and set `last_used_at` for each named tool.
    async fn record_usage(&self, names: &[String], at: DateTime<Utc>) -> DomainResult<()>;

    /// Insert or replace the statistics row keyed by name.
    async fn upsert(&self, stat: &ToolUsageStat) -> DomainResult<()>;
}
