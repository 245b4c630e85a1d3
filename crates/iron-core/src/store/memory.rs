use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use iron_model::{KvPair, KvSnapshot, ServiceEntry};
use tokio::sync::watch;
use tracing::trace;

use super::{BlockingQuery, KvStore, ServiceCatalog, StoreError};

/// In-process key/value store with blocking-query support.
///
/// Every write bumps a global index, mirroring how the HTTP store reports changes.
/// Useful for local runs without a store agent and as a test double.
pub struct MemoryStore {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
    index: watch::Sender<u64>,
    failures: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (index, _) = watch::channel(1);
        Self {
            data: Mutex::new(BTreeMap::new()),
            index,
            failures: AtomicUsize::new(0),
        }
    }

    /// Current change index.
    pub fn index(&self) -> u64 {
        *self.index.borrow()
    }

    /// Read one key back.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    /// Same as [`MemoryStore::get`], decoded as UTF-8.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|v| String::from_utf8_lossy(&v).into_owned())
    }

    /// Write a key without going through the async trait.
    pub fn set(&self, key: &str, value: impl Into<Vec<u8>>) {
        let mut data = self.lock();
        data.insert(key.to_string(), value.into());
        self.index.send_modify(|i| *i += 1);
    }

    /// Delete a key; bumps the index only if the key existed.
    pub fn remove(&self, key: &str) -> bool {
        let mut data = self.lock();
        let existed = data.remove(key).is_some();
        if existed {
            self.index.send_modify(|i| *i += 1);
        }
        existed
    }

    /// Make the next `n` list calls fail with a transient error.
    pub fn inject_failures(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn wait_past(&self, query: BlockingQuery) {
        let mut rx = self.index.subscribe();
        let wait = async {
            while *rx.borrow_and_update() <= query.index {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        };
        let _ = tokio::time::timeout(query.wait, wait).await;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn list(&self, prefix: &str, query: Option<BlockingQuery>) -> Result<KvSnapshot, StoreError> {
        if let Some(query) = query {
            self.wait_past(query).await;
        }
        if self.take_failure() {
            return Err(StoreError::Transient("injected failure".into()));
        }

        let data = self.lock();
        let pairs: Vec<KvPair> = data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| KvPair::new(k.clone(), v.clone()))
            .collect();
        let index = *self.index.borrow();
        trace!(prefix, index, len = pairs.len(), "memory store listed");
        Ok(KvSnapshot::new(pairs, index))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.set(key, value);
        Ok(())
    }
}

/// In-process service catalog.
#[derive(Default)]
pub struct MemoryCatalog {
    entries: Mutex<Vec<ServiceEntry>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; lookups return entries in registration order.
    pub fn register(&self, entry: ServiceEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }
}

#[async_trait]
impl ServiceCatalog for MemoryCatalog {
    async fn health_service(&self, service: &str, tag: &str) -> Result<Vec<ServiceEntry>, StoreError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries
            .iter()
            .filter(|e| e.service == service && e.tags.iter().any(|t| t == tag))
            .cloned()
            .collect())
    }
}
