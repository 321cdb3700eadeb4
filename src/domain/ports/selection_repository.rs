//! Repository port for selection history.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::SelectionRecord;

#[async_trait]
pub trait SelectionRepository: Send + Sync {
    async fn save(&self, record: &SelectionRecord) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<SelectionRecord>>;

    /// Most recent selections, newest first.
    async fn recent(&self, limit: usize) -> DomainResult<Vec<SelectionRecord>>;
}
