//! Mechanism for the single supervised child: spawn, output forwarding, exit
//! notification, and graceful reload with SIGKILL escalation.
//!
//! Scheduling policy (when to spawn or reload) belongs to the caller.
mod handle;
pub use handle::{ChildExit, LiveState, ProcessHandle, Retired};

mod wait;

use std::{process::Stdio, sync::Arc, time::Duration};

use iron_core::{ReloadMode, SupervisorContext};
use iron_model::EnvMap;
use tokio::{
    process::Command,
    sync::{mpsc, oneshot, watch},
};
use tracing::{debug, info, trace, warn};

use crate::{
    ExecError,
    output::{self, LogConfig, OutputSink, Stream, TracingSink},
};
use wait::ExitWatch;

/// Timing knobs of the supervisor.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub log: LogConfig,
    /// How long a SIGTERM'd child may take to exit before it is killed.
    pub grace: Duration,
    /// How long to wait for trailing output after the child exited.
    pub drain: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            grace: Duration::from_secs(3),
            drain: Duration::from_secs(1),
        }
    }
}

pub struct ProcessSupervisor {
    ctx: SupervisorContext,
    cfg: SupervisorConfig,
    sink: Arc<dyn OutputSink>,
}

impl ProcessSupervisor {
    pub fn new(ctx: SupervisorContext) -> Self {
        let cfg = SupervisorConfig::default();
        Self {
            ctx,
            sink: Arc::new(TracingSink::new(cfg.log)),
            cfg,
        }
    }

    /// Replace the timing configuration. Also resets the sink to a [`TracingSink`]
    /// using the new log settings.
    pub fn with_config(mut self, cfg: SupervisorConfig) -> Self {
        self.cfg = cfg;
        self.sink = Arc::new(TracingSink::new(cfg.log));
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Start `argv` with `env` overlaid on the inherited environment.
    ///
    /// Must be called inside a tokio runtime: the output forwarders and the exit-wait
    /// task are spawned before this returns.
    pub fn spawn(&self, argv: &[String], env: &EnvMap) -> Result<ProcessHandle, ExecError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ExecError::InvalidSpec("command is empty".into()))?;
        if program.trim().is_empty() {
            return Err(ExecError::InvalidSpec("command is empty".into()));
        }

        trace!(command = %program, args = ?args, env_len = env.len(), "spawning child");
        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(env.iter())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            command: program.clone(),
            source,
        })?;
        let pid = child
            .id()
            .ok_or_else(|| ExecError::InvalidSpec("spawned child has no pid".into()))?;

        let max_line = self.cfg.log.max_line_length;
        let mut forwarders = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            forwarders.push(tokio::spawn(output::forward(out, pid, Stream::Stdout, self.sink.clone(), max_line)));
        }
        if let Some(err) = child.stderr.take() {
            forwarders.push(tokio::spawn(output::forward(err, pid, Stream::Stderr, self.sink.clone(), max_line)));
        }

        let (state_tx, state_rx) = watch::channel(handle::LiveState::Starting);
        let (control_tx, control_rx) = mpsc::channel(1);
        let (exit_tx, exit_rx) = oneshot::channel();

        tokio::spawn(
            ExitWatch {
                child,
                pid,
                control: control_rx,
                state: state_tx,
                exit: exit_tx,
                forwarders,
                drain: self.cfg.drain,
                metrics: self.ctx.metrics().clone(),
            }
            .run(),
        );

        self.ctx.metrics().record_spawn();
        info!(app = self.ctx.app(), pid, command = %program, "child started");
        Ok(ProcessHandle::new(pid, argv.to_vec(), env.clone(), state_rx, control_tx, exit_rx))
    }

    /// Retire `handle`: SIGTERM, wait up to the grace window, then SIGKILL.
    ///
    /// Returns only once the child is confirmed gone. A child that already exited is
    /// not signalled at all.
    pub async fn reload(&self, mut handle: ProcessHandle) -> Retired {
        let pid = handle.pid();
        if let Some(exit) = handle.try_exit() {
            debug!(pid, code = exit.code, "child already exited, nothing to retire");
            return Retired::Exited(exit.code);
        }

        match handle.terminate().await {
            Ok(()) => {
                if tokio::time::timeout(self.cfg.grace, handle.reaped()).await.is_ok() {
                    let exit = handle.wait_exit().await;
                    info!(pid, code = exit.code, "child exited gracefully");
                    self.ctx.metrics().record_reload(ReloadMode::Graceful);
                    return Retired::Exited(exit.code);
                }
                warn!(pid, grace_ms = self.cfg.grace.as_millis() as u64, "child ignored SIGTERM, killing");
            }
            Err(ExecError::Exited) => {
                let exit = handle.wait_exit().await;
                return Retired::Exited(exit.code);
            }
            Err(e) => warn!(pid, error = %e, "SIGTERM failed, assuming child is alive"),
        }

        match handle.kill().await {
            Ok(()) => {}
            Err(ExecError::Exited) => {
                // Reaped between the grace check and the kill request; no SIGKILL was sent.
                let exit = handle.wait_exit().await;
                info!(pid, code = exit.code, "child exited before SIGKILL");
                self.ctx.metrics().record_reload(ReloadMode::Graceful);
                return Retired::Exited(exit.code);
            }
            Err(e) => warn!(pid, error = %e, "SIGKILL failed"),
        }
        let exit = handle.wait_exit().await;
        self.ctx.metrics().record_reload(ReloadMode::Forced);
        info!(pid, code = exit.code, "child killed");
        Retired::Killed(exit.code)
    }
}
