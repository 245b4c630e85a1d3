use std::time::Duration;

use iron_core::StoreError;
use reqwest::{Client, RequestBuilder, Response};
use tracing::trace;

use crate::{ConsulConfig, ConsulError, error};

/// Header carrying the store's change index.
pub(crate) const INDEX_HEADER: &str = "X-Consul-Index";

/// Extra time granted on top of a blocking query's `wait` before the request times out.
const BLOCKING_SLACK: Duration = Duration::from_secs(30);

/// HTTP client for one Consul agent.
#[derive(Debug, Clone)]
pub struct ConsulClient {
    http: Client,
    base: String,
    cfg: ConsulConfig,
}

impl ConsulClient {
    pub fn new(cfg: ConsulConfig) -> Result<Self, ConsulError> {
        let base = cfg.base_url();
        reqwest::Url::parse(&base).map_err(|_| ConsulError::InvalidAddress(cfg.address.clone()))?;
        let http = Client::builder().build()?;
        Ok(Self { http, base, cfg })
    }

    pub fn config(&self) -> &ConsulConfig {
        &self.cfg
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base, path.trim_start_matches('/'))
    }

    /// Attach the datacenter and a timeout fitting the request kind.
    pub(crate) fn prepare(&self, req: RequestBuilder, blocking: Option<Duration>) -> RequestBuilder {
        let timeout = match blocking {
            Some(wait) => wait + BLOCKING_SLACK,
            None => self.cfg.request_timeout,
        };
        let req = req.timeout(timeout);
        match &self.cfg.datacenter {
            Some(dc) => req.query(&[("dc", dc)]),
            None => req,
        }
    }

    /// Send a request; any status outside 2xx (and 404 when `allow_missing`) is an error.
    pub(crate) async fn send(&self, req: RequestBuilder, allow_missing: bool) -> Result<Response, StoreError> {
        let resp = req.send().await.map_err(error::from_transport)?;
        let status = resp.status();
        trace!(status = %status, url = %resp.url(), "consul responded");
        if status.is_success() || (allow_missing && status == reqwest::StatusCode::NOT_FOUND) {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(error::from_status(status, &body))
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }
}

/// Change index from the response headers; 0 when absent or unparsable.
pub(crate) fn response_index(resp: &Response) -> u64 {
    resp.headers()
        .get(INDEX_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_api_path() {
        let client = ConsulClient::new(ConsulConfig::new("127.0.0.1:8500")).unwrap();
        assert_eq!(client.url("kv/ns/app/"), "http://127.0.0.1:8500/v1/kv/ns/app/");
    }

    #[test]
    fn rejects_garbage_address() {
        assert!(matches!(
            ConsulClient::new(ConsulConfig::new("bad host:8500")),
            Err(ConsulError::InvalidAddress(_))
        ));
    }
}
