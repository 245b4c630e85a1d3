use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("service {service}:{tag} not found")]
    NotFound { service: String, tag: String },

    #[error("service {service}:{tag} is not healthy")]
    Unhealthy { service: String, tag: String },

    #[error("service lookup failed: {0}")]
    Store(#[from] StoreError),
}
