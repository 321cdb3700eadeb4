//! In-process gauge of open resolution sessions, exposed as telemetry.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{MetricType, TelemetrySample};
use crate::domain::ports::TelemetrySource;

/// Sessions started by a recommendation and not yet closed by an outcome.
/// Outcome rates come from the pattern store instead, see
/// [`OutcomeTelemetrySource`](crate::services::OutcomeTelemetrySource).
#[derive(Debug, Default)]
pub struct SessionCounters {
    active: AtomicU64,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_started(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_finished(&self) {
        // Outcomes may be reported for sessions this process never started.
        let _ = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn active(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TelemetrySource for SessionCounters {
    async fn collect(&self) -> DomainResult<Vec<TelemetrySample>> {
        Ok(vec![TelemetrySample::now(
            MetricType::ActiveSessions,
            self.active() as f64,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_reports_open_sessions() {
        let counters = SessionCounters::new();
        counters.session_started();
        counters.session_started();
        counters.session_finished();

        let samples = counters.collect().await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].metric, MetricType::ActiveSessions);
        assert_eq!(samples[0].value, 1.0);
    }

    #[test]
    fn test_active_never_underflows() {
        let counters = SessionCounters::new();
        counters.session_finished();
        assert_eq!(counters.active(), 0);
    }
}
