//! Telemetry sources backed by the host and by composition.

use std::sync::Arc;

use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{MetricType, TelemetrySample};
use crate::domain::ports::TelemetrySource;

/// Host CPU and memory usage, both reported as fractions in [0, 1].
pub struct SystemTelemetrySource {
    system: Mutex<System>,
}

impl SystemTelemetrySource {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SystemTelemetrySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for SystemTelemetrySource {
    async fn collect(&self) -> DomainResult<Vec<TelemetrySample>> {
        let mut sys = self.system.lock().await;
        sys.refresh_cpu_all();
        sys.refresh_memory();

        let total = sys.total_memory();
        if total == 0 {
            return Err(DomainError::TelemetryUnavailable(
                "total memory reported as zero".to_string(),
            ));
        }

        let cpu = (f64::from(sys.global_cpu_usage()) / 100.0).clamp(0.0, 1.0);
        let memory = (sys.used_memory() as f64 / total as f64).clamp(0.0, 1.0);

        Ok(vec![
            TelemetrySample::now(MetricType::CpuUsage, cpu),
            TelemetrySample::now(MetricType::MemoryUsage, memory),
        ])
    }
}

/// Fans out to several sources. A failing source is logged and skipped so
/// one broken probe never blanks the whole cycle.
pub struct CompositeTelemetrySource {
    sources: Vec<(String, Arc<dyn TelemetrySource>)>,
}

impl CompositeTelemetrySource {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, name: impl Into<String>, source: Arc<dyn TelemetrySource>) -> Self {
        self.sources.push((name.into(), source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for CompositeTelemetrySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for CompositeTelemetrySource {
    async fn collect(&self) -> DomainResult<Vec<TelemetrySample>> {
        let mut samples = Vec::new();
        for (name, source) in &self.sources {
            match source.collect().await {
                Ok(mut collected) => samples.append(&mut collected),
                Err(e) => warn!(source = %name, error = %e, "Telemetry source failed, skipping"),
            }
        }
        Ok(samples)
    }
}
