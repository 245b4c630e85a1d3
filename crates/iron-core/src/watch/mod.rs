//! Long-polling watcher over one store prefix.
//!
//! [`ConfigWatcher::fetch_initial`] reads once and fails fast. [`ConfigWatcher::watch`]
//! spawns a task that issues blocking queries from a cursor and delivers every result
//! through a one-slot channel until cancelled.
mod error;
pub use error::WatchError;

mod retry;
pub use retry::RetryPolicy;
use retry::{Attempted, with_retry};

use std::time::Duration;

use iron_model::KvSnapshot;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::{BlockingQuery, StoreHandle};

/// How long the store may hold one blocking query open.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(300);

/// Event produced by a running watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Snapshot(KvSnapshot),
    /// Terminal: the watch task stops after delivering it.
    Failed(WatchError),
}

/// Watches `<prefix>/` in a key/value store.
pub struct ConfigWatcher {
    store: StoreHandle,
    prefix: String,
    policy: RetryPolicy,
    wait: Duration,
}

impl ConfigWatcher {
    /// Watch every key below `prefix` (the trailing `/` is added here).
    pub fn new(store: StoreHandle, prefix: impl AsRef<str>) -> Self {
        Self {
            store,
            prefix: format!("{}/", prefix.as_ref().trim_end_matches('/')),
            policy: RetryPolicy::default(),
            wait: DEFAULT_WAIT,
        }
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Listing prefix, always ending in `/`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Immediate, non-retried read.
    pub async fn fetch_initial(&self) -> Result<KvSnapshot, WatchError> {
        let snapshot = self
            .store
            .list(&self.prefix, None)
            .await
            .map_err(WatchError::Initial)?;
        debug!(prefix = %self.prefix, index = snapshot.index(), len = snapshot.len(), "initial snapshot fetched");
        Ok(snapshot)
    }

    /// Start long-polling from `from_index`.
    ///
    /// The returned stream yields events until `cancel` fires or a terminal
    /// [`WatchEvent::Failed`] has been delivered. Nothing is delivered after cancellation.
    pub fn watch(&self, from_index: u64, cancel: CancellationToken) -> WatchStream {
        let (tx, rx) = mpsc::channel(1);
        let task = WatchTask {
            store: self.store.clone(),
            prefix: self.prefix.clone(),
            policy: self.policy,
            wait: self.wait,
            cancel,
            tx,
        };
        info!(prefix = %self.prefix, index = from_index, "watching keys for changes");
        WatchStream {
            rx,
            task: tokio::spawn(task.run(from_index)),
        }
    }
}

/// Receiving end of a watch. Dropping it stops the watch task.
pub struct WatchStream {
    rx: mpsc::Receiver<WatchEvent>,
    task: JoinHandle<()>,
}

impl WatchStream {
    /// Next event, or `None` once the watch has stopped.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }
}

impl Drop for WatchStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct WatchTask {
    store: StoreHandle,
    prefix: String,
    policy: RetryPolicy,
    wait: Duration,
    cancel: CancellationToken,
    tx: mpsc::Sender<WatchEvent>,
}

impl WatchTask {
    async fn run(self, from_index: u64) {
        let mut cursor = from_index;
        loop {
            let query = BlockingQuery {
                index: cursor,
                wait: self.wait,
            };
            let attempted = with_retry(&self.policy, &self.cancel, || {
                self.store.list(&self.prefix, Some(query))
            })
            .await;

            match attempted {
                Attempted::Ok(snapshot) => {
                    let next = next_cursor(cursor, snapshot.index());
                    if snapshot.index() < cursor {
                        debug!(prefix = %self.prefix, from = cursor, to = snapshot.index(), "store index went backwards, resetting cursor");
                    }
                    cursor = next;
                    if !self.deliver(WatchEvent::Snapshot(snapshot)).await {
                        return;
                    }
                }
                Attempted::Exhausted { retries, source } => {
                    warn!(prefix = %self.prefix, retries, error = %source, "watch retries exhausted");
                    self.deliver(WatchEvent::Failed(WatchError::Exhausted { retries, source }))
                        .await;
                    return;
                }
                Attempted::Fatal(e) => {
                    self.deliver(WatchEvent::Failed(WatchError::Fatal(e))).await;
                    return;
                }
                Attempted::Cancelled => return,
            }
        }
    }

    /// Returns `false` when the watch should stop (cancelled or receiver gone).
    async fn deliver(&self, event: WatchEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            res = self.tx.send(event) => res.is_ok(),
        }
    }
}

/// Cursor for the next blocking query after the store returned `returned`.
///
/// An index that went backwards means the store lost its state; start over from 0.
/// An index of 0 would make the next query return immediately, so it becomes 1.
fn next_cursor(prev: u64, returned: u64) -> u64 {
    if returned < prev { 0 } else { returned.max(1) }
}
