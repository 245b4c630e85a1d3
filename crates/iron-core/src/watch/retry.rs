use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::store::StoreError;

/// Bounded linear backoff for idempotent store reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// The n-th retry sleeps `n * delay_step`.
    pub delay_step: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay_step: Duration) -> Self {
        Self {
            max_retries,
            delay_step,
        }
    }

    /// Sleep before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_step.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub(crate) enum Attempted<T> {
    Ok(T),
    /// Every attempt failed transiently.
    Exhausted { retries: u32, source: StoreError },
    /// A non-transient failure; never retried.
    Fatal(StoreError),
    /// Cancellation fired while waiting on the operation or a backoff sleep.
    Cancelled,
}

/// Run `op`, retrying transient failures per `policy`.
///
/// Cancellation is checked before every attempt and interrupts both the in-flight
/// call and backoff sleeps.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut retries = 0;
    loop {
        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Attempted::Cancelled,
            res = op() => res,
        };

        let err = match res {
            Ok(v) => return Attempted::Ok(v),
            Err(e) if !e.is_transient() => return Attempted::Fatal(e),
            Err(e) => e,
        };
        if retries >= policy.max_retries {
            return Attempted::Exhausted {
                retries,
                source: err,
            };
        }

        retries += 1;
        let delay = policy.delay(retries);
        warn!(attempt = retries, delay_ms = delay.as_millis() as u64, error = %err, "store read failed, retrying");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Attempted::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;

    fn counting(
        calls: &Arc<AtomicU32>,
        result: Result<u32, StoreError>,
    ) -> impl FnMut() -> std::future::Ready<Result<u32, StoreError>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(result.clone())
        }
    }

    #[test]
    fn delay_grows_linearly() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay(1), Duration::from_secs(2));
        assert_eq!(p.delay(3), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn always_transient_retries_exactly_max_times() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = tokio::time::Instant::now();
        let op = counting(&calls, Err(StoreError::Transient("down".into())));

        let res = with_retry(&RetryPolicy::default(), &CancellationToken::new(), op).await;

        assert!(matches!(res, Attempted::Exhausted { retries: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(2 + 4 + 6));
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let op = counting(&calls, Err(StoreError::Fatal("403".into())));

        let res = with_retry(&RetryPolicy::default(), &CancellationToken::new(), op).await;

        assert!(matches!(res, Attempted::Fatal(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_blip() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);
        let op = move || {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n < 2 {
                Err(StoreError::Transient("blip".into()))
            } else {
                Ok(n)
            })
        };

        let res = with_retry(&RetryPolicy::default(), &CancellationToken::new(), op).await;
        assert!(matches!(res, Attempted::Ok(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_backoff() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let op = counting(&calls, Err(StoreError::Transient("down".into())));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let res = with_retry(&RetryPolicy::default(), &cancel, op).await;
        assert!(matches!(res, Attempted::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
