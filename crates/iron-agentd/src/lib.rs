//! The `iron-agentd` supervisor: configuration, the orchestration loop and
//! the process-level plumbing around it.
pub mod config;
pub use config::{AgentConfig, Cli, ConfigError};

pub mod metrics_http;

pub mod orchestrator;
pub use orchestrator::{LoopConfig, LoopReport, LoopStats, Orchestrator, OrchestratorError, StopReason};

pub mod signals;
