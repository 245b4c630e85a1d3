//! Periodic resource sampling of the live child.
mod reader;
pub use reader::{ProcessReader, SysinfoReader};
pub use reader::{
    CPU_PERCENT, IO_READ_BYTES, IO_READ_TOTAL_BYTES, IO_WRITE_BYTES, IO_WRITE_TOTAL_BYTES, MEM_RSS_BYTES,
    MEM_VIRTUAL_BYTES,
};

use std::time::Duration;

use iron_core::MetricsHandle;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

pub struct MetricsSampler;

impl MetricsSampler {
    /// Sample `pid` every `interval` with the OS reader until `cancel` fires.
    pub fn start(pid: u32, interval: Duration, metrics: MetricsHandle, cancel: CancellationToken) -> JoinHandle<()> {
        Self::start_with(SysinfoReader::new(), pid, interval, metrics, cancel)
    }

    /// Same as [`MetricsSampler::start`] with a custom reader.
    ///
    /// Reader and backend errors are logged and the loop keeps going.
    pub fn start_with<P: ProcessReader>(
        mut reader: P,
        pid: u32,
        interval: Duration,
        metrics: MetricsHandle,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let period = interval.max(Duration::from_millis(10));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(pid, interval_ms = period.as_millis() as u64, "metrics sampler started");

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let sample = match reader.sample(pid) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(pid, error = %e, "failed to sample child resources");
                        continue;
                    }
                };
                trace!(pid, counters = sample.counters.len(), "child sampled");
                if let Err(e) = metrics.record_sample(&sample) {
                    warn!(pid, error = %e, "failed to forward metric sample");
                }
            }
            debug!(pid, "metrics sampler stopped");
        })
    }
}
