use iron_core::StoreError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsulError {
    #[error("invalid consul address '{0}'")]
    InvalidAddress(String),

    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Classify a transport failure for retry decisions.
pub(crate) fn from_transport(e: reqwest::Error) -> StoreError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        StoreError::Transient(e.to_string())
    } else if e.is_decode() {
        StoreError::Fatal(format!("undecodable response: {e}"))
    } else {
        StoreError::Transient(e.to_string())
    }
}

/// Classify an unexpected HTTP status: 5xx is worth retrying, anything else is not.
pub(crate) fn from_status(status: StatusCode, body: &str) -> StoreError {
    let msg = format!("consul returned {status}: {}", body.trim());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        StoreError::Transient(msg)
    } else {
        StoreError::Fatal(msg)
    }
}
