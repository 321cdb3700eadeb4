//! Port for anything that can produce telemetry readings.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::TelemetrySample;

/// A producer of point-in-time metric readings.
///
/// The optimizer does not care how readings are obtained; host probes,
/// in-process counters and test fixtures all implement this.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn collect(&self) -> DomainResult<Vec<TelemetrySample>>;
}
