//! Child process mechanics: spawning, output forwarding, graceful reload, and
//! resource sampling.
mod error;
pub use error::ExecError;

mod host;
pub use host::host_info;

pub mod output;
pub use output::{LineAssembler, LogConfig, OutputSink, Stream, TracingSink};

pub mod sampler;
pub use sampler::{MetricsSampler, ProcessReader, SysinfoReader};

mod signal;

pub mod supervisor;
pub use supervisor::{ChildExit, LiveState, ProcessHandle, ProcessSupervisor, Retired, SupervisorConfig};
