//! Configuration-driven supervision core: store access, watching, environment
//! composition and service resolution.
//!
//! Process management lives in `iron-exec`; the event loop that ties both together
//! lives in `iron-agentd`.
pub mod compose;
pub mod context;
pub mod metadata;
pub mod metrics;
pub mod resolve;
pub mod store;
pub mod watch;

pub use compose::{ComposeOptions, Composed, EnvironmentComposer};
pub use context::SupervisorContext;
pub use metadata::{metadata_prefix, persist_metadata};
pub use metrics::{ExitOutcome, MetricsBackend, MetricsError, MetricsHandle, NoOpMetrics, ReloadMode, noop_metrics};
pub use resolve::{Resolution, ResolveError, ServiceResolver};
pub use store::{BlockingQuery, CatalogHandle, KvStore, MemoryCatalog, MemoryStore, ServiceCatalog, StoreError, StoreHandle};
pub use watch::{ConfigWatcher, RetryPolicy, WatchError, WatchEvent, WatchStream};

pub mod prelude {
    pub use crate::compose::{Composed, EnvironmentComposer};
    pub use crate::context::SupervisorContext;
    pub use crate::store::{KvStore, ServiceCatalog, StoreError};
    pub use crate::watch::{ConfigWatcher, WatchEvent};
}
