//! Metrics collection abstraction for the supervisor.
//!
//! Backends (prometheus, ...) implement [`MetricsBackend`] and are injected via [`crate::SupervisorContext`].
mod backend;
pub use backend::{ExitOutcome, MetricsBackend, MetricsError, MetricsHandle, ReloadMode};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
