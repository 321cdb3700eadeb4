//! Repository port for learning patterns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{LearningPattern, OutcomeTotals};

/// Append-mostly store of completed attempts.
///
/// Rows are immutable once inserted apart from `usage_count`, which only
/// grows.
#[async_trait]
pub trait PatternRepository: Send + Sync {
    /// Insert a new pattern.
    async fn insert(&self, pattern: &LearningPattern) -> DomainResult<()>;

    /// Load a pattern by id.
    async fn get(&self, id: Uuid) -> DomainResult<Option<LearningPattern>>;

    /// Successful patterns ordered by `success_rate DESC, usage_count DESC`.
    ///
    /// This is the bounded candidate pool the similarity retriever scores.
    async fn top_successful(&self, limit: usize) -> DomainResult<Vec<LearningPattern>>;

    /// Patterns created at or after `since`, oldest first.
    async fn created_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> DomainResult<Vec<LearningPattern>>;

    /// The most recent `limit` patterns, oldest first.
    async fn recent(&self, limit: usize) -> DomainResult<Vec<LearningPattern>>;

    /// Success and failure counts plus summed durations of patterns created
    /// in `[since, until)`.
    async fn outcome_totals(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DomainResult<OutcomeTotals>;

    /// Increment the usage count after the pattern was reused as a match.
    async fn increment_usage(&self, id: Uuid) -> DomainResult<()>;

    /// Total number of stored patterns.
    async fn count(&self) -> DomainResult<u64>;
}
