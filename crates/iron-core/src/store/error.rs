use thiserror::Error;

/// Store-boundary failure, classified for retry decisions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Safe to retry: connection reset, timeout, 5xx.
    #[error("transient store error: {0}")]
    Transient(String),

    /// Retrying will not help: bad request, permission denied, undecodable payload.
    #[error("store error: {0}")]
    Fatal(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}
