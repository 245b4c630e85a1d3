use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid specification: {0}")]
    InvalidSpec(String),

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    /// The child has already exited; its exit notification is pending or delivered.
    #[error("process already exited")]
    Exited,

    #[error("process {0} not found")]
    ProcessGone(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
