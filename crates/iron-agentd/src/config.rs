//! Command line surface and the agent configuration built from it.
use std::{net::SocketAddr, time::Duration};

use clap::{ArgAction, Parser};
use iron_consul::ConsulConfig;
use iron_core::ComposeOptions;
use iron_model::{ModelError, ServiceLink, parse_links};
use iron_observe::{LoggerConfig, LoggerFormat, LoggerLevel, LoggerTimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orchestrator::LoopConfig;

pub const DEFAULT_NAMESPACE: &str = "iron-app";

/// Supervise one command with its environment taken from the config store.
#[derive(Debug, Parser)]
#[command(name = "iron-agentd", version)]
pub struct Cli {
    /// Abort on the first service resolution failure.
    #[arg(long)]
    pub errexit: bool,

    /// Restart the command when its configuration changes.
    #[arg(long)]
    pub reload: bool,

    /// Config store HTTP address.
    #[arg(long, default_value = "127.0.0.1:8500")]
    pub addr: String,

    /// Datacenter; the agent's own when blank.
    #[arg(long, default_value = "")]
    pub dc: String,

    /// Replace characters outside [A-Za-z0-9_] in variable names with '_'.
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub sanitize: bool,

    /// Uppercase variable names.
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub upcase: bool,

    /// Debug-level logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Comma-separated `service:tag` list resolved before the first start.
    #[arg(long, default_value = "")]
    pub discover: String,

    /// Notification hook: empty, `chat`, or a file path.
    #[arg(long, default_value = "")]
    pub loghook: String,

    /// Resource sampling interval in seconds.
    #[arg(long, default_value_t = 5)]
    pub poll_interval: u64,

    /// Namespace root in the config store.
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Serve Prometheus metrics at `/metrics` on this address.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,

    #[arg(long, default_value = "text")]
    pub log_format: LoggerFormat,

    /// Filter expression; overrides --verbose.
    #[arg(long)]
    pub log_level: Option<LoggerLevel>,

    #[arg(long, default_value = "utc")]
    pub log_tz: LoggerTimeZone,

    /// Application name under the namespace.
    pub app: String,

    /// Command to supervise, with its arguments.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("application name must be a single non-empty path segment, got {0:?}")]
    InvalidApp(String),

    #[error("namespace must not be empty")]
    EmptyNamespace,

    #[error("command must not be empty")]
    EmptyCommand,

    #[error("poll interval must be at least one second")]
    ZeroPollInterval,

    #[error("invalid discovery list: {0}")]
    Discover(#[from] ModelError),
}

/// Resolved agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub app: String,
    pub namespace: String,
    pub command: Vec<String>,
    pub consul: ConsulConfig,
    pub links: Vec<ServiceLink>,
    pub sanitize: bool,
    pub upcase: bool,
    pub reload: bool,
    pub errexit: bool,
    pub poll_interval_secs: u64,
    pub metrics_addr: Option<SocketAddr>,
    pub loghook: String,
    pub logger: LoggerConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            app: String::new(),
            namespace: DEFAULT_NAMESPACE.into(),
            command: Vec::new(),
            consul: ConsulConfig::default(),
            links: Vec::new(),
            sanitize: true,
            upcase: true,
            reload: false,
            errexit: false,
            poll_interval_secs: 5,
            metrics_addr: None,
            loghook: String::new(),
            logger: LoggerConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Store prefix of the application.
    pub fn prefix(&self) -> String {
        format!("{}/{}", self.namespace.trim_end_matches('/'), self.app)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Check the invariants the loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.trim().is_empty() || self.app.contains('/') {
            return Err(ConfigError::InvalidApp(self.app.clone()));
        }
        if self.namespace.trim_end_matches('/').is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if self.command.is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            prefix: self.prefix(),
            command: self.command.clone(),
            links: self.links.clone(),
            compose: ComposeOptions {
                sanitize: self.sanitize,
                upcase: self.upcase,
            },
            reload: self.reload,
            errexit: self.errexit,
            poll_interval: self.poll_interval(),
        }
    }
}

impl TryFrom<Cli> for AgentConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let mut logger = LoggerConfig::for_verbosity(cli.verbose);
        if let Some(level) = cli.log_level {
            logger.level = level;
        }
        logger.format = cli.log_format;
        logger.tz = cli.log_tz;

        let config = Self {
            links: parse_links(&cli.discover)?,
            app: cli.app,
            namespace: cli.namespace,
            command: cli.command,
            consul: ConsulConfig::new(cli.addr).with_datacenter(cli.dc),
            sanitize: cli.sanitize,
            upcase: cli.upcase,
            reload: cli.reload,
            errexit: cli.errexit,
            poll_interval_secs: cli.poll_interval,
            metrics_addr: cli.metrics_addr,
            loghook: cli.loghook,
            logger,
        };
        config.validate()?;
        Ok(config)
    }
}
