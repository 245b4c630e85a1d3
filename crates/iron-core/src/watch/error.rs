use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WatchError {
    /// The first read failed; it is never retried.
    #[error("initial fetch failed: {0}")]
    Initial(StoreError),

    /// A long-poll kept failing transiently until the retry budget ran out.
    #[error("store still failing after {retries} retries: {source}")]
    Exhausted { retries: u32, source: StoreError },

    /// A long-poll failed in a way retrying cannot fix.
    #[error("fatal watch error: {0}")]
    Fatal(StoreError),
}

impl WatchError {
    /// The underlying store failure.
    pub fn store_error(&self) -> &StoreError {
        match self {
            WatchError::Initial(e) | WatchError::Fatal(e) => e,
            WatchError::Exhausted { source, .. } => source,
        }
    }
}
