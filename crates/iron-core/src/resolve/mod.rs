//! One-shot `service:tag` resolution against the health catalog.
//!
//! Resolved facts are written into the application's store prefix as
//! `<TAG>_HOST` / `<TAG>_PORT`, so they flow into the child environment through
//! the regular watch/compose path. Instances are resolved once at startup and never
//! refreshed afterwards.
mod error;
pub use error::ResolveError;

use iron_model::{HealthStatus, ServiceEntry, ServiceInstance, ServiceLink};
use tracing::{debug, info, warn};

use crate::store::{CatalogHandle, StoreHandle};

/// Outcome of resolving a list of links without failing fast.
#[derive(Debug, Default)]
pub struct Resolution {
    pub resolved: Vec<(ServiceLink, ServiceInstance)>,
    pub failed: Vec<(ServiceLink, ResolveError)>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ServiceResolver {
    catalog: CatalogHandle,
    store: StoreHandle,
    prefix: String,
}

impl ServiceResolver {
    /// `prefix` is the application prefix facts are written under.
    pub fn new(catalog: CatalogHandle, store: StoreHandle, prefix: impl AsRef<str>) -> Self {
        Self {
            catalog,
            store,
            prefix: prefix.as_ref().trim_end_matches('/').to_string(),
        }
    }

    /// Look up the first instance for `link` and check its health.
    pub async fn resolve(&self, link: &ServiceLink) -> Result<ServiceInstance, ResolveError> {
        let entries = self
            .catalog
            .health_service(link.service(), link.tag())
            .await?;

        // First match wins; no balancing or proximity.
        let entry = entries.into_iter().next().ok_or_else(|| ResolveError::NotFound {
            service: link.service().to_string(),
            tag: link.tag().to_string(),
        })?;

        if !is_healthy(&entry, link.service()) {
            return Err(ResolveError::Unhealthy {
                service: link.service().to_string(),
                tag: link.tag().to_string(),
            });
        }

        info!(service = %entry.service, node = %entry.node, "service identified as healthy");
        Ok(ServiceInstance {
            address: entry.address().to_string(),
            port: entry.port,
            health: HealthStatus::Passing,
        })
    }

    /// Resolve `link` and write its host/port facts into the store.
    pub async fn resolve_and_inject(&self, link: &ServiceLink) -> Result<ServiceInstance, ResolveError> {
        let instance = self.resolve(link).await?;
        let tag = link.tag().to_uppercase();

        let host_key = format!("{}/{tag}_HOST", self.prefix);
        self.store.put(&host_key, instance.address.as_bytes()).await?;
        debug!(key = %host_key, value = %instance.address, "stored service host");

        match instance.port {
            Some(port) => {
                let port_key = format!("{}/{tag}_PORT", self.prefix);
                self.store.put(&port_key, port.to_string().as_bytes()).await?;
                debug!(key = %port_key, port, "stored service port");
            }
            None => warn!(service = link.service(), tag = link.tag(), "service port not found, skipping"),
        }
        Ok(instance)
    }

    /// Resolve and inject every link in order.
    ///
    /// With `fail_fast` the first failure is returned as `Err`. Otherwise failures are
    /// logged, collected, and the remaining links are still resolved.
    pub async fn resolve_all(&self, links: &[ServiceLink], fail_fast: bool) -> Result<Resolution, ResolveError> {
        let mut out = Resolution::default();
        for link in links {
            match self.resolve_and_inject(link).await {
                Ok(instance) => out.resolved.push((link.clone(), instance)),
                Err(e) if fail_fast => return Err(e),
                Err(e) => {
                    warn!(link = %link, error = %e, "service resolution failed, continuing");
                    out.failed.push((link.clone(), e));
                }
            }
        }
        Ok(out)
    }
}

/// Healthy iff some check bound to `service` reports passing. No such check means unhealthy.
fn is_healthy(entry: &ServiceEntry, service: &str) -> bool {
    let mut bound = entry.checks.iter().filter(|c| c.service_name == service).peekable();
    if bound.peek().is_none() {
        warn!(service, node = %entry.node, "no health check report for service");
        return false;
    }
    bound.any(|c| {
        debug!(check = %c.check_id, name = %c.name, status = %c.status, "found health report");
        c.is_passing()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use iron_model::HealthCheck;

    use super::*;
    use crate::store::{MemoryCatalog, MemoryStore};

    fn check(service: &str, status: &str) -> HealthCheck {
        HealthCheck {
            check_id: format!("service:{service}"),
            name: format!("{service} alive"),
            service_name: service.into(),
            status: status.into(),
        }
    }

    fn entry(address: &str, port: Option<u16>, checks: Vec<HealthCheck>) -> ServiceEntry {
        ServiceEntry {
            node: "node-1".into(),
            node_address: "10.0.0.1".into(),
            service_id: "web-1".into(),
            service: "web".into(),
            service_address: address.into(),
            port,
            tags: vec!["primary".into()],
            checks,
        }
    }

    fn setup(entries: Vec<ServiceEntry>) -> (Arc<MemoryStore>, ServiceResolver) {
        let catalog = Arc::new(MemoryCatalog::new());
        for e in entries {
            catalog.register(e);
        }
        let store = Arc::new(MemoryStore::new());
        let resolver = ServiceResolver::new(catalog, store.clone(), "app");
        (store, resolver)
    }

    fn web() -> ServiceLink {
        ServiceLink::new("web", "primary")
    }

    #[tokio::test]
    async fn injects_host_and_port_for_healthy_instance() {
        let (store, resolver) = setup(vec![entry("10.0.0.5", Some(8080), vec![check("web", "passing")])]);

        let instance = resolver.resolve_and_inject(&web()).await.unwrap();

        assert_eq!(instance.address, "10.0.0.5");
        assert_eq!(store.get_str("app/PRIMARY_HOST").as_deref(), Some("10.0.0.5"));
        assert_eq!(store.get_str("app/PRIMARY_PORT").as_deref(), Some("8080"));
    }

    #[tokio::test]
    async fn missing_port_skips_port_key() {
        let (store, resolver) = setup(vec![entry("", None, vec![check("web", "passing")])]);

        resolver.resolve_and_inject(&web()).await.unwrap();

        assert_eq!(store.get_str("app/PRIMARY_HOST").as_deref(), Some("10.0.0.1"));
        assert!(store.get("app/PRIMARY_PORT").is_none());
    }

    #[tokio::test]
    async fn no_instances_is_not_found() {
        let (_, resolver) = setup(Vec::new());
        let err = resolver.resolve(&web()).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { ref service, .. } if service == "web"));
    }

    #[tokio::test]
    async fn failing_or_missing_checks_are_unhealthy() {
        for checks in [
            vec![check("web", "critical")],
            vec![check("db", "passing")],
            Vec::new(),
        ] {
            let (store, resolver) = setup(vec![entry("10.0.0.5", Some(80), checks)]);
            let err = resolver.resolve_and_inject(&web()).await.unwrap_err();
            assert!(matches!(err, ResolveError::Unhealthy { .. }));
            assert!(store.get("app/PRIMARY_HOST").is_none());
        }
    }

    #[tokio::test]
    async fn only_first_instance_is_considered() {
        let (_, resolver) = setup(vec![
            entry("10.0.0.5", Some(80), vec![check("web", "critical")]),
            entry("10.0.0.6", Some(80), vec![check("web", "passing")]),
        ]);
        assert!(resolver.resolve(&web()).await.is_err());
    }

    #[tokio::test]
    async fn resolve_all_continues_unless_fail_fast() {
        let (store, resolver) = setup(vec![entry("10.0.0.5", Some(80), vec![check("web", "passing")])]);
        let links = [ServiceLink::new("db", "main"), web()];

        let res = resolver.resolve_all(&links, false).await.unwrap();
        assert_eq!(res.resolved.len(), 1);
        assert_eq!(res.failed.len(), 1);
        assert!(!res.is_complete());
        assert!(store.get("app/PRIMARY_HOST").is_some());

        let err = resolver.resolve_all(&links, true).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { ref service, .. } if service == "db"));
    }
}
