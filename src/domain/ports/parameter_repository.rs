//! Repository port for tunable parameters and their adjustment history.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AdjustmentRecord, OptimizationParameter};

#[async_trait]
pub trait ParameterRepository: Send + Sync {
    /// Insert parameters that do not exist yet; existing rows keep their
    /// current value. Returns the number of rows created.
    async fn seed(&self, parameters: &[OptimizationParameter]) -> DomainResult<usize>;

    async fn get(&self, category: &str, name: &str) -> DomainResult<Option<OptimizationParameter>>;

    async fn list(&self) -> DomainResult<Vec<OptimizationParameter>>;

    /// Commit a new current value.
    ///
    /// # Errors
    /// `ParameterNotFound` for unknown keys and `ParameterOutOfBounds` when
    /// `value` lies outside the stored `[min, max]`.
    async fn update_value(&self, category: &str, name: &str, value: f64) -> DomainResult<()>;

    /// Append an adjustment history row.
    async fn record_adjustment(&self, record: &AdjustmentRecord) -> DomainResult<()>;

    /// Most recent adjustment history rows, newest first.
    async fn recent_adjustments(&self, limit: usize) -> DomainResult<Vec<AdjustmentRecord>>;
}
