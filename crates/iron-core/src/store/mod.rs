//! Boundary to the configuration store and the service catalog.
//!
//! Implementations: [`MemoryStore`]/[`MemoryCatalog`] (in-process) and the HTTP client in `iron-consul`.
mod error;
pub use error::StoreError;

mod memory;
pub use memory::{MemoryCatalog, MemoryStore};

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use iron_model::{KvSnapshot, ServiceEntry};

/// Parameters of a blocking ("wait for index > N") read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockingQuery {
    /// Return only once the store index is greater than this value (or `wait` elapses).
    pub index: u64,
    /// Upper bound the store may hold the request open.
    pub wait: Duration,
}

/// Prefix-scoped key/value store.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// List every pair whose key starts with `prefix`.
    ///
    /// With `query = None` the read is immediate; otherwise it blocks per [`BlockingQuery`].
    async fn list(&self, prefix: &str, query: Option<BlockingQuery>) -> Result<KvSnapshot, StoreError>;

    /// Write a single key.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

/// Health-filtered service lookup.
#[async_trait]
pub trait ServiceCatalog: Send + Sync + 'static {
    /// Instances of `service` carrying `tag`, each with its attached health checks.
    async fn health_service(&self, service: &str, tag: &str) -> Result<Vec<ServiceEntry>, StoreError>;
}

pub type StoreHandle = Arc<dyn KvStore>;
pub type CatalogHandle = Arc<dyn ServiceCatalog>;
