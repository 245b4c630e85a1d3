use serde::{Deserialize, Serialize};

/// Status string the catalog reports for a healthy check.
pub const HEALTH_PASSING: &str = "passing";

/// One health-check result attached to a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub check_id: String,
    pub name: String,
    /// Service the check is bound to; empty for node-level checks.
    pub service_name: String,
    pub status: String,
}

impl HealthCheck {
    pub fn is_passing(&self) -> bool {
        self.status == HEALTH_PASSING
    }
}

/// Candidate instance returned by a health-filtered catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    pub node: String,
    pub node_address: String,
    pub service_id: String,
    pub service: String,
    /// Service-level address; empty means "use the node address".
    pub service_address: String,
    pub port: Option<u16>,
    pub tags: Vec<String>,
    pub checks: Vec<HealthCheck>,
}

impl ServiceEntry {
    /// Address clients should connect to.
    pub fn address(&self) -> &str {
        if self.service_address.is_empty() {
            &self.node_address
        } else {
            &self.service_address
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Passing,
    Unhealthy,
}

/// A resolved, health-checked service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub address: String,
    pub port: Option<u16>,
    pub health: HealthStatus,
}
