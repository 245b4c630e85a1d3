use serde::{Deserialize, Serialize};

/// Facts about the host the child runs on, persisted next to the process metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfo {
    pub hostname: String,
    pub os: String,
    pub platform: String,
    pub platform_family: String,
    pub platform_version: String,
}

impl HostInfo {
    /// Relative metadata keys and their values, in a stable order.
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("host/hostname", &self.hostname),
            ("host/os", &self.os),
            ("host/platform/name", &self.platform),
            ("host/platform/family", &self.platform_family),
            ("host/platform/version", &self.platform_version),
        ]
    }
}
