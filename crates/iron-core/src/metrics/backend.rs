use std::sync::Arc;

use iron_model::MetricSample;
use thiserror::Error;

/// How a child process ended, for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited by itself with code 0.
    Success,
    /// Exited by itself with a non-zero code.
    Failure,
    /// Terminated by a signal (including our own SIGTERM/SIGKILL).
    Signaled,
    /// Exit status could not be determined.
    Lost,
}

impl ExitOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ExitOutcome::Success => "success",
            ExitOutcome::Failure => "failure",
            ExitOutcome::Signaled => "signaled",
            ExitOutcome::Lost => "lost",
        }
    }
}

/// How a running child was retired during a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadMode {
    /// Exited within the grace window after SIGTERM.
    Graceful,
    /// Escalated to SIGKILL.
    Forced,
}

impl ReloadMode {
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ReloadMode::Graceful => "graceful",
            ReloadMode::Forced => "forced",
        }
    }
}

#[derive(Debug, Error)]
pub enum MetricsError {
    /// The backend refused the sample (bad name, wrong value type).
    #[error("metric sample rejected: {0}")]
    Rejected(String),

    /// The backend cannot accept samples right now.
    #[error("metrics backend unavailable: {0}")]
    Unavailable(String),
}

/// Backend metrics collection interface.
///
/// Implementations are injected via [`crate::SupervisorContext`] and shared by the
/// supervisor, the sampler and the orchestrator.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record a successful child spawn.
    fn record_spawn(&self);
    /// Record child termination with outcome and lifetime.
    ///
    /// # Arguments
    /// - `outcome`: How the child terminated
    /// - `lifetime_ms`: Time between spawn and observed exit, in milliseconds
    fn record_exit(&self, outcome: ExitOutcome, lifetime_ms: u64);
    /// Record a completed reload.
    fn record_reload(&self, mode: ReloadMode);
    /// Forward one resource sample.
    ///
    /// Errors are reported to the caller, which logs them and carries on.
    fn record_sample(&self, sample: &MetricSample) -> Result<(), MetricsError>;
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
