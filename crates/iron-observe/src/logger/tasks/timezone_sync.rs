//! Periodic refresh of the cached local UTC offset.
//!
//! Picks up DST transitions for `LoggerTimeZone::Local` without restarting the process.
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::logger::object::timezone::sync_local_offset;

/// Delay between two offset refreshes.
pub const TZ_SYNC_PERIOD: Duration = Duration::from_secs(3_600);

/// Spawn the refresh loop; it stops when `cancel` fires.
pub fn timezone_sync(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + TZ_SYNC_PERIOD,
            TZ_SYNC_PERIOD,
        );
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if sync_local_offset() {
                        debug!("timezone offset refreshed");
                    }
                }
            }
        }
        debug!("timezone sync stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stops_once_cancelled() {
        let cancel = CancellationToken::new();
        let task = timezone_sync(cancel.clone());
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("sync task did not stop")
            .unwrap();
    }
}
