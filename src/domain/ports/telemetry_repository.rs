//! Repository port for telemetry time series.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{MetricType, TelemetrySample};

#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    async fn record(&self, samples: &[TelemetrySample]) -> DomainResult<()>;

    /// Samples of `metric` recorded at or after `since`, oldest first.
    async fn samples_since(
        &self,
        metric: MetricType,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<TelemetrySample>>;

    /// Delete samples recorded before `before`. Returns the number removed.
    async fn prune_before(&self, before: DateTime<Utc>) -> DomainResult<u64>;
}
