use iron_model::MetricSample;

use crate::metrics::backend::{ExitOutcome, MetricsBackend, MetricsError, ReloadMode};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_spawn(&self) {}

    #[inline(always)]
    fn record_exit(&self, _: ExitOutcome, _: u64) {}

    #[inline(always)]
    fn record_reload(&self, _: ReloadMode) {}

    #[inline(always)]
    fn record_sample(&self, _: &MetricSample) -> Result<(), MetricsError> {
        Ok(())
    }
}
