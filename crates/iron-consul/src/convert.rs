//! Wire DTOs of the Consul HTTP API and their conversion into model types.
//!
//! Values are validated here so nothing loosely typed leaves this crate.
use base64::{Engine, engine::general_purpose::STANDARD};
use iron_core::StoreError;
use iron_model::{HealthCheck, KvPair, ServiceEntry};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct KvEntryDto {
    pub key: String,
    /// Base64-encoded; `null` for keys without a value.
    #[serde(default)]
    pub value: Option<String>,
}

impl TryFrom<KvEntryDto> for KvPair {
    type Error = StoreError;

    fn try_from(dto: KvEntryDto) -> Result<Self, Self::Error> {
        let value = match dto.value {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| StoreError::Fatal(format!("key '{}' has invalid base64 value: {e}", dto.key)))?,
            None => Vec::new(),
        };
        Ok(KvPair::new(dto.key, value))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct HealthEntryDto {
    pub node: NodeDto,
    pub service: AgentServiceDto,
    #[serde(default)]
    pub checks: Vec<CheckDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct NodeDto {
    pub node: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AgentServiceDto {
    #[serde(rename = "ID")]
    pub id: String,
    pub service: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CheckDto {
    #[serde(rename = "CheckID")]
    pub check_id: String,
    pub name: String,
    #[serde(default)]
    pub service_name: String,
    pub status: String,
}

impl From<CheckDto> for HealthCheck {
    fn from(dto: CheckDto) -> Self {
        HealthCheck {
            check_id: dto.check_id,
            name: dto.name,
            service_name: dto.service_name,
            status: dto.status,
        }
    }
}

impl TryFrom<HealthEntryDto> for ServiceEntry {
    type Error = StoreError;

    fn try_from(dto: HealthEntryDto) -> Result<Self, Self::Error> {
        // Consul reports "no port" as 0.
        let port = match dto.service.port {
            0 => None,
            p => Some(u16::try_from(p).map_err(|_| {
                StoreError::Fatal(format!("service '{}' has invalid port {p}", dto.service.service))
            })?),
        };
        Ok(ServiceEntry {
            node: dto.node.node,
            node_address: dto.node.address,
            service_id: dto.service.id,
            service: dto.service.service,
            service_address: dto.service.address,
            port,
            tags: dto.service.tags.unwrap_or_default(),
            checks: dto.checks.into_iter().map(HealthCheck::from).collect(),
        })
    }
}
