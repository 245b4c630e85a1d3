use async_trait::async_trait;
use iron_core::{ServiceCatalog, StoreError};
use iron_model::ServiceEntry;
use tracing::debug;

use crate::{ConsulClient, convert::HealthEntryDto, error};

#[async_trait]
impl ServiceCatalog for ConsulClient {
    async fn health_service(&self, service: &str, tag: &str) -> Result<Vec<ServiceEntry>, StoreError> {
        let req = self
            .http()
            .get(self.url(&format!("health/service/{service}")))
            .query(&[("tag", tag)]);
        let req = self.prepare(req, None);

        let resp = self.send(req, false).await?;
        let entries: Vec<HealthEntryDto> = resp.json().await.map_err(error::from_transport)?;
        debug!(service, tag, found = entries.len(), "catalog lookup");
        entries.into_iter().map(ServiceEntry::try_from).collect()
    }
}
