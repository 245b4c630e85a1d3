use async_trait::async_trait;
use iron_core::{BlockingQuery, KvStore, StoreError};
use iron_model::{KvPair, KvSnapshot};
use reqwest::StatusCode;
use tracing::debug;

use crate::{
    ConsulClient,
    client::response_index,
    convert::KvEntryDto,
    error,
};

#[async_trait]
impl KvStore for ConsulClient {
    async fn list(&self, prefix: &str, query: Option<BlockingQuery>) -> Result<KvSnapshot, StoreError> {
        let mut req = self
            .http()
            .get(self.url(&format!("kv/{prefix}")))
            .query(&[("recurse", "true")]);
        if let Some(q) = query {
            req = req.query(&[("index", q.index.to_string()), ("wait", format!("{}s", q.wait.as_secs().max(1)))]);
        }
        let req = self.prepare(req, query.map(|q| q.wait));

        let resp = self.send(req, true).await?;
        let index = response_index(&resp);
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(prefix, index, "no keys under prefix");
            return Ok(KvSnapshot::new(Vec::new(), index));
        }

        let entries: Vec<KvEntryDto> = resp.json().await.map_err(error::from_transport)?;
        let pairs = entries
            .into_iter()
            .map(KvPair::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(prefix, index, len = pairs.len(), "listed keys");
        Ok(KvSnapshot::new(pairs, index))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let req = self
            .http()
            .put(self.url(&format!("kv/{key}")))
            .body(value.to_vec());
        let req = self.prepare(req, None);

        let resp = self.send(req, false).await?;
        let stored: bool = resp.json().await.map_err(error::from_transport)?;
        if !stored {
            return Err(StoreError::Fatal(format!("consul refused to store '{key}'")));
        }
        debug!(key, "stored key");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Matcher;

    use super::*;
    use crate::ConsulConfig;

    fn client(server: &mockito::ServerGuard) -> ConsulClient {
        ConsulClient::new(ConsulConfig::new(server.url())).unwrap()
    }

    #[tokio::test]
    async fn list_decodes_values_and_index() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/kv/ns/app/")
            .match_query(Matcher::UrlEncoded("recurse".into(), "true".into()))
            .with_header("X-Consul-Index", "42")
            .with_body(r#"[{"Key":"ns/app/FOO","Value":"YmFy"},{"Key":"ns/app/dir/","Value":null}]"#)
            .create_async()
            .await;

        let snap = client(&server).list("ns/app/", None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(snap.index(), 42);
        assert_eq!(snap.pairs()[0].value(), b"bar");
        assert!(snap.pairs()[1].is_folder());
    }

    #[tokio::test]
    async fn blocking_list_sends_index_and_wait() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/kv/ns/app/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("index".into(), "7".into()),
                Matcher::UrlEncoded("wait".into(), "60s".into()),
                Matcher::UrlEncoded("dc".into(), "eu1".into()),
            ]))
            .with_header("X-Consul-Index", "8")
            .with_body("[]")
            .create_async()
            .await;

        let cfg = ConsulConfig::new(server.url()).with_datacenter("eu1");
        let query = BlockingQuery {
            index: 7,
            wait: Duration::from_secs(60),
        };
        let snap = ConsulClient::new(cfg).unwrap().list("ns/app/", Some(query)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(snap.index(), 8);
        assert!(snap.is_empty());
    }

    #[tokio::test]
    async fn missing_prefix_is_an_empty_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/kv/ns/app/")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_header("X-Consul-Index", "3")
            .create_async()
            .await;

        let snap = client(&server).list("ns/app/", None).await.unwrap();
        assert!(snap.is_empty());
        assert_eq!(snap.index(), 3);
    }

    #[tokio::test]
    async fn status_codes_are_classified() {
        let mut server = mockito::Server::new_async().await;
        let _unavailable = server
            .mock("GET", "/v1/kv/down/")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;
        let _forbidden = server
            .mock("GET", "/v1/kv/secret/")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("ACL not found")
            .create_async()
            .await;

        let c = client(&server);
        assert!(c.list("down/", None).await.unwrap_err().is_transient());
        assert!(!c.list("secret/", None).await.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn unreachable_agent_is_transient() {
        let c = ConsulClient::new(ConsulConfig::new("127.0.0.1:1")).unwrap();
        assert!(c.list("ns/app/", None).await.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn put_sends_raw_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/v1/kv/ns/app/metadata/command")
            .match_body("sleep 30")
            .with_body("true")
            .create_async()
            .await;

        client(&server)
            .put("ns/app/metadata/command", b"sleep 30")
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
