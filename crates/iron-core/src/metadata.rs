//! Process metadata written under `<prefix>/metadata/` after every spawn.
use iron_model::{HostInfo, METADATA_SEGMENT};
use tracing::{debug, warn};

use crate::store::KvStore;

/// Root of the metadata subtree for an application prefix.
pub fn metadata_prefix(prefix: &str) -> String {
    format!("{}/{METADATA_SEGMENT}", prefix.trim_end_matches('/'))
}

/// Write application name, command line and host facts.
///
/// Best-effort: each failed write is logged and counted, none aborts the rest.
/// Returns the number of failed writes.
pub async fn persist_metadata(
    store: &dyn KvStore,
    prefix: &str,
    app: &str,
    argv: &[String],
    host: &HostInfo,
) -> usize {
    let root = metadata_prefix(prefix);
    let command = argv.join(" ");

    let entries = [("application", app), ("command", command.as_str())]
        .into_iter()
        .chain(host.entries());

    let mut failed = 0;
    for (rel, value) in entries {
        let key = format!("{root}/{rel}");
        match store.put(&key, value.as_bytes()).await {
            Ok(()) => debug!(key = %key, "metadata stored"),
            Err(e) => {
                failed += 1;
                warn!(key = %key, error = %e, "failed to store metadata");
            }
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use iron_model::KvSnapshot;

    use super::*;
    use crate::store::{BlockingQuery, MemoryStore, StoreError};

    struct ReadOnly;

    #[async_trait]
    impl KvStore for ReadOnly {
        async fn list(&self, _: &str, _: Option<BlockingQuery>) -> Result<KvSnapshot, StoreError> {
            Ok(KvSnapshot::default())
        }

        async fn put(&self, _: &str, _: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Fatal("permission denied".into()))
        }
    }

    fn host() -> HostInfo {
        HostInfo {
            hostname: "box".into(),
            os: "linux".into(),
            platform: "debian".into(),
            platform_family: "debian".into(),
            platform_version: "12".into(),
        }
    }

    #[test]
    fn prefix_is_nested_under_app() {
        assert_eq!(metadata_prefix("iron-app/web"), "iron-app/web/metadata");
        assert_eq!(metadata_prefix("iron-app/web/"), "iron-app/web/metadata");
    }

    #[tokio::test]
    async fn writes_every_entry() {
        let store = MemoryStore::new();
        let argv = vec!["sleep".to_string(), "30".to_string()];

        let failed = persist_metadata(&store, "ns/web", "web", &argv, &host()).await;

        assert_eq!(failed, 0);
        assert_eq!(store.get_str("ns/web/metadata/application").as_deref(), Some("web"));
        assert_eq!(store.get_str("ns/web/metadata/command").as_deref(), Some("sleep 30"));
        assert_eq!(store.get_str("ns/web/metadata/host/hostname").as_deref(), Some("box"));
        assert_eq!(store.get_str("ns/web/metadata/host/platform/version").as_deref(), Some("12"));
    }

    #[tokio::test]
    async fn failures_are_counted_not_propagated() {
        let failed = persist_metadata(&ReadOnly, "ns/web", "web", &[], &host()).await;
        assert_eq!(failed, 7);
    }
}
