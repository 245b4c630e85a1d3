use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// A `service:tag` reference to resolve against the service catalog before the child starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceLink {
    service: String,
    tag: String,
}

impl ServiceLink {
    pub fn new<S, T>(service: S, tag: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            service: service.into(),
            tag: tag.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl FromStr for ServiceLink {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (service, tag) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ModelError::InvalidLink(s.to_string()))?;

        let (service, tag) = (service.trim(), tag.trim());
        if service.is_empty() || tag.is_empty() || tag.contains(':') {
            return Err(ModelError::InvalidLink(s.to_string()));
        }
        Ok(Self::new(service, tag))
    }
}

impl TryFrom<String> for ServiceLink {
    type Error = ModelError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ServiceLink> for String {
    fn from(l: ServiceLink) -> Self {
        l.to_string()
    }
}

impl fmt::Display for ServiceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.tag)
    }
}

/// Parse a comma-separated discovery list (`"web:primary,db:main"`).
///
/// Blank entries are skipped, so an empty flag value yields an empty list.
pub fn parse_links(raw: &str) -> Result<Vec<ServiceLink>, ModelError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}
