use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for a Consul agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsulConfig {
    /// `host:port` or a full `http(s)://` URL.
    pub address: String,
    /// Datacenter; the agent's own when `None`.
    pub datacenter: Option<String>,
    /// Timeout for immediate (non-blocking) requests.
    #[serde(with = "secs")]
    pub request_timeout: Duration,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8500".into(),
            datacenter: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ConsulConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Set the datacenter; blank means "local".
    pub fn with_datacenter(mut self, dc: impl Into<String>) -> Self {
        let dc = dc.into();
        self.datacenter = (!dc.trim().is_empty()).then_some(dc);
        self
    }

    /// Base URL with scheme and without trailing slash.
    pub fn base_url(&self) -> String {
        let addr = self.address.trim().trim_end_matches('/');
        if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_adds_scheme() {
        assert_eq!(ConsulConfig::default().base_url(), "http://127.0.0.1:8500");
        assert_eq!(ConsulConfig::new("https://consul.local/").base_url(), "https://consul.local");
    }

    #[test]
    fn blank_datacenter_means_local() {
        assert_eq!(ConsulConfig::default().with_datacenter("  ").datacenter, None);
        assert_eq!(
            ConsulConfig::default().with_datacenter("eu1").datacenter.as_deref(),
            Some("eu1")
        );
    }
}
