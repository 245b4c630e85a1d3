//! The event loop tying watcher, composer, resolver and supervisor together.
//!
//! The loop owns the applied environment and the single live child. It waits on
//! three sources at once (shutdown, the child's exit, the next watch event) and
//! acts on whichever is ready first.
mod error;
pub use error::OrchestratorError;

mod report;
pub use report::{LoopReport, LoopStats, StopReason};

use std::time::Duration;

use iron_core::{
    CatalogHandle, ComposeOptions, Composed, ConfigWatcher, EnvironmentComposer, RetryPolicy,
    ServiceResolver, StoreHandle, SupervisorContext, WatchEvent, persist_metadata,
};
use iron_exec::{ChildExit, MetricsSampler, ProcessHandle, ProcessSupervisor, Retired};
use iron_model::{EnvMap, HostInfo, KvSnapshot, ServiceLink};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What the loop runs and how it reacts to drift.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Store prefix of the application (`<namespace>/<app>`).
    pub prefix: String,
    /// Child argv; must not be empty.
    pub command: Vec<String>,
    /// Services to resolve before the first spawn.
    pub links: Vec<ServiceLink>,
    pub compose: ComposeOptions,
    /// Restart the child when its environment changes.
    pub reload: bool,
    /// Abort on the first service resolution failure.
    pub errexit: bool,
    /// Resource sampling interval.
    pub poll_interval: Duration,
}

impl LoopConfig {
    pub fn new(prefix: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            prefix: prefix.into(),
            command,
            links: Vec::new(),
            compose: ComposeOptions::default(),
            reload: false,
            errexit: false,
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// The live child plus its sampler.
struct Live {
    handle: ProcessHandle,
    sampler_cancel: CancellationToken,
    sampler: JoinHandle<()>,
}

/// Loop-owned mutable state.
#[derive(Default)]
struct LoopState {
    current: Option<Live>,
    /// Environment the current (or last spawned) child was launched with.
    applied: Option<EnvMap>,
    stats: LoopStats,
}

pub struct Orchestrator {
    ctx: SupervisorContext,
    cfg: LoopConfig,
    store: StoreHandle,
    watcher: ConfigWatcher,
    composer: EnvironmentComposer,
    resolver: ServiceResolver,
    supervisor: ProcessSupervisor,
    host: HostInfo,
    progress: watch::Sender<LoopStats>,
}

impl Orchestrator {
    pub fn new(
        ctx: SupervisorContext,
        cfg: LoopConfig,
        store: StoreHandle,
        catalog: CatalogHandle,
    ) -> Self {
        let watcher = ConfigWatcher::new(store.clone(), &cfg.prefix);
        let composer = EnvironmentComposer::new(&cfg.prefix, cfg.compose);
        let resolver = ServiceResolver::new(catalog, store.clone(), &cfg.prefix);
        let supervisor = ProcessSupervisor::new(ctx.clone());
        let (progress, _) = watch::channel(LoopStats::default());
        Self {
            ctx,
            cfg,
            store,
            watcher,
            composer,
            resolver,
            supervisor,
            host: iron_exec::host_info(),
            progress,
        }
    }

    /// Replace the process supervisor (grace window, output sink).
    pub fn with_supervisor(mut self, supervisor: ProcessSupervisor) -> Self {
        self.supervisor = supervisor;
        self
    }

    /// Replace the watch retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.watcher = self.watcher.with_retry(policy);
        self
    }

    /// Host facts persisted next to the process metadata.
    pub fn with_host(mut self, host: HostInfo) -> Self {
        self.host = host;
        self
    }

    /// Live view of the loop counters.
    pub fn progress(&self) -> watch::Receiver<LoopStats> {
        self.progress.subscribe()
    }

    /// Run until the child exits, shutdown is requested, or a fatal error occurs.
    pub async fn run(self, shutdown: CancellationToken) -> Result<LoopReport, OrchestratorError> {
        let res = self.run_inner(&shutdown).await;
        if let Err(e) = &res {
            error!(app = self.ctx.app(), error = %e, "supervision failed");
            self.ctx.notify_error("supervision failed", e.to_string()).await;
        }
        res
    }

    async fn run_inner(&self, shutdown: &CancellationToken) -> Result<LoopReport, OrchestratorError> {
        if !self.cfg.links.is_empty() {
            let resolution = self.resolver.resolve_all(&self.cfg.links, self.cfg.errexit).await?;
            info!(
                resolved = resolution.resolved.len(),
                failed = resolution.failed.len(),
                "service discovery done"
            );
            for (link, e) in &resolution.failed {
                self.ctx.notify_warning("service unresolved", format!("{link}: {e}")).await;
            }
        }

        let initial = self.watcher.fetch_initial().await?;
        let mut state = LoopState::default();
        self.apply(&initial, &mut state, shutdown).await?;

        let mut events = self.watcher.watch(initial.index(), shutdown.child_token());
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    return Ok(self.stop(state).await);
                }
                exit = wait_current(&mut state.current) => {
                    return Ok(self.child_exited(state, exit).await);
                }
                event = events.next() => match event {
                    Some(WatchEvent::Snapshot(snapshot)) => {
                        self.apply(&snapshot, &mut state, shutdown).await?
                    }
                    Some(WatchEvent::Failed(e)) => {
                        self.retire_current(&mut state).await;
                        return Err(e.into());
                    }
                    // The watch only ends on its own after cancellation.
                    None => return Ok(self.stop(state).await),
                },
            }
        }
    }

    /// Apply one snapshot per the drift policy.
    async fn apply(
        &self,
        snapshot: &KvSnapshot,
        state: &mut LoopState,
        shutdown: &CancellationToken,
    ) -> Result<(), OrchestratorError> {
        let composed = self.composer.compose(snapshot, state.applied.as_ref());
        state.stats.last_index = snapshot.index();

        let env = match composed {
            Composed::Unchanged => {
                state.stats.unchanged += 1;
                debug!(index = snapshot.index(), "configuration unchanged");
                self.publish(state);
                return Ok(());
            }
            Composed::Changed(env) => env,
        };

        match state.current.take() {
            None => self.spawn(env, state, shutdown).await?,
            Some(live) if !self.cfg.reload => {
                let empty = EnvMap::new();
                let previous = state.applied.as_ref().unwrap_or(&empty);
                let changed: Vec<&str> = env.changed_keys(previous).collect();
                warn!(
                    pid = live.handle.pid(),
                    changed = ?changed,
                    "configuration drift ignored, reload disabled"
                );
                state.stats.ignored_drift += 1;
                state.current = Some(live);
            }
            Some(mut live) => {
                // Already gone: let the loop observe the exit instead of replacing it.
                if live.handle.try_exit().is_some() {
                    state.current = Some(live);
                    self.publish(state);
                    return Ok(());
                }
                info!(pid = live.handle.pid(), "configuration changed, reloading child");
                let retired = self.retire(live).await;
                state.stats.retired += 1;
                debug!(code = retired.code(), "old child retired");
                self.spawn(env, state, shutdown).await?;
            }
        }
        self.publish(state);
        Ok(())
    }

    async fn spawn(
        &self,
        env: EnvMap,
        state: &mut LoopState,
        shutdown: &CancellationToken,
    ) -> Result<(), OrchestratorError> {
        let handle = self.supervisor.spawn(&self.cfg.command, &env)?;
        state.stats.spawned += 1;

        let failed = persist_metadata(
            self.store.as_ref(),
            &self.cfg.prefix,
            self.ctx.app(),
            handle.argv(),
            &self.host,
        )
        .await;
        if failed > 0 {
            warn!(failed, "some metadata entries were not stored");
        }

        let sampler_cancel = shutdown.child_token();
        let sampler = MetricsSampler::start(
            handle.pid(),
            self.cfg.poll_interval,
            self.ctx.metrics().clone(),
            sampler_cancel.clone(),
        );

        state.applied = Some(env);
        state.current = Some(Live {
            handle,
            sampler_cancel,
            sampler,
        });
        Ok(())
    }

    /// Stop sampling and retire the child through the graceful escalation.
    async fn retire(&self, live: Live) -> Retired {
        live.sampler_cancel.cancel();
        let retired = self.supervisor.reload(live.handle).await;
        let _ = live.sampler.await;
        retired
    }

    async fn retire_current(&self, state: &mut LoopState) -> Option<Retired> {
        match state.current.take() {
            Some(live) => Some(self.retire(live).await),
            None => None,
        }
    }

    async fn stop(&self, mut state: LoopState) -> LoopReport {
        info!(app = self.ctx.app(), "shutdown requested");
        let exit_code = self.retire_current(&mut state).await.map_or(0, |r| r.code());
        self.publish(&state);
        LoopReport {
            exit_code,
            reason: StopReason::Shutdown,
            stats: state.stats,
        }
    }

    async fn child_exited(&self, mut state: LoopState, exit: ChildExit) -> LoopReport {
        if let Some(live) = state.current.take() {
            live.sampler_cancel.cancel();
            let _ = live.sampler.await;
        }
        if exit.code != 0 {
            warn!(code = exit.code, "child exited with failure");
            self.ctx
                .notify_error("child exited", format!("exit code {}", exit.code))
                .await;
        } else {
            info!("child exited successfully");
        }
        self.publish(&state);
        LoopReport {
            exit_code: exit.code,
            reason: StopReason::ChildExited,
            stats: state.stats,
        }
    }

    fn publish(&self, state: &LoopState) {
        self.progress.send_replace(state.stats);
    }
}

/// Exit of the live child; pending forever when there is none.
async fn wait_current(current: &mut Option<Live>) -> ChildExit {
    match current {
        Some(live) => live.handle.wait_exit().await,
        None => std::future::pending().await,
    }
}
