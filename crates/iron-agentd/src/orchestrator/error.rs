use iron_core::{ResolveError, WatchError};
use iron_exec::ExecError;
use iron_model::INTERNAL_FAILURE_EXIT_CODE;
use thiserror::Error;

/// Supervision-level failure that ends the loop.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("service resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("configuration watch failed: {0}")]
    Watch(#[from] WatchError),

    #[error("child process failed: {0}")]
    Exec(#[from] ExecError),
}

impl OrchestratorError {
    /// Process exit code reported for this failure.
    pub fn exit_code(&self) -> i32 {
        INTERNAL_FAILURE_EXIT_CODE
    }
}
