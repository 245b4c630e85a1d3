#![cfg(unix)]

use std::{sync::Arc, time::Duration};

use iron_agentd::{LoopConfig, LoopReport, LoopStats, Orchestrator, OrchestratorError, StopReason};
use iron_core::{MemoryCatalog, MemoryStore, ResolveError, RetryPolicy, SupervisorContext, WatchError};
use iron_exec::ExecError;
use iron_model::{HealthCheck, HostInfo, ServiceEntry, ServiceLink};
use iron_observe::{FileHook, NotificationSink};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

const PREFIX: &str = "iron-app/web";

struct Harness {
    store: Arc<MemoryStore>,
    catalog: Arc<MemoryCatalog>,
    ctx: SupervisorContext,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        store.set(&format!("{PREFIX}/FOO"), "1");
        Self {
            store,
            catalog: Arc::new(MemoryCatalog::new()),
            ctx: SupervisorContext::new("web"),
        }
    }

    fn with_notify_file(mut self, path: &std::path::Path) -> Self {
        self.ctx = self.ctx.with_notifier(NotificationSink::File(FileHook::new(path)));
        self
    }

    fn orchestrator(&self, cfg: LoopConfig) -> Orchestrator {
        Orchestrator::new(self.ctx.clone(), cfg, self.store.clone(), self.catalog.clone()).with_host(HostInfo {
            hostname: "test-host".into(),
            ..HostInfo::default()
        })
    }

    fn start(
        &self,
        cfg: LoopConfig,
    ) -> (
        watch::Receiver<LoopStats>,
        CancellationToken,
        JoinHandle<Result<LoopReport, OrchestratorError>>,
    ) {
        let orch = self.orchestrator(cfg);
        let progress = orch.progress();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(orch.run(shutdown.clone()));
        (progress, shutdown, task)
    }

    fn key(&self, rel: &str) -> String {
        format!("{PREFIX}/{rel}")
    }
}

fn cmd(argv: &[&str]) -> LoopConfig {
    LoopConfig::new(PREFIX, argv.iter().map(|s| s.to_string()).collect())
}

fn sh(script: &str) -> LoopConfig {
    cmd(&["sh", "-c", script])
}

async fn wait_for(progress: &mut watch::Receiver<LoopStats>, pred: impl FnMut(&LoopStats) -> bool) -> LoopStats {
    let stats = tokio::time::timeout(Duration::from_secs(10), progress.wait_for(pred))
        .await
        .expect("loop did not reach the expected state")
        .expect("loop stopped early");
    *stats
}

fn register_web(catalog: &MemoryCatalog, status: &str) {
    catalog.register(ServiceEntry {
        node: "node-1".into(),
        node_address: "10.0.0.1".into(),
        service_id: "web-1".into(),
        service: "web".into(),
        service_address: "10.0.0.5".into(),
        port: Some(8080),
        tags: vec!["primary".into()],
        checks: vec![HealthCheck {
            check_id: "service:web-1".into(),
            name: "web alive".into(),
            service_name: "web".into(),
            status: status.into(),
        }],
    });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clean_exit_is_the_result() {
    let h = Harness::new();
    let report = h.orchestrator(cmd(&["true"])).run(CancellationToken::new()).await.unwrap();

    assert_eq!(report.exit_code, 0);
    assert_eq!(report.reason, StopReason::ChildExited);
    assert_eq!(report.stats.spawned, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn child_failure_code_is_the_result() {
    let h = Harness::new();
    let report = h.orchestrator(sh("exit 2")).run(CancellationToken::new()).await.unwrap();

    assert_eq!(report.exit_code, 2);
    assert_eq!(report.reason, StopReason::ChildExited);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_zero_exit_is_notified() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("notify.log");
    let h = Harness::new().with_notify_file(&log);

    let report = h.orchestrator(sh("exit 3")).run(CancellationToken::new()).await.unwrap();
    assert_eq!(report.exit_code, 3);

    let content = std::fs::read_to_string(&log).unwrap();
    assert!(content.contains("[web - error] child exited: exit code 3"), "{content}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn child_sees_composed_environment() {
    let h = Harness::new();
    h.store.set(&h.key("db/max-conns"), "10");

    let report = h
        .orchestrator(sh(r#"test "$FOO" = 1 && test "$DB_MAX_CONNS" = 10"#))
        .run(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.exit_code, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn resolved_services_are_injected_before_spawn() {
    let h = Harness::new();
    register_web(&h.catalog, "passing");

    let mut cfg = sh(r#"test "$PRIMARY_HOST" = 10.0.0.5 && test "$PRIMARY_PORT" = 8080"#);
    cfg.links = vec![ServiceLink::new("web", "primary")];
    let report = h.orchestrator(cfg).run(CancellationToken::new()).await.unwrap();

    assert_eq!(report.exit_code, 0);
    assert_eq!(h.store.get_str(&h.key("PRIMARY_HOST")).as_deref(), Some("10.0.0.5"));
    assert_eq!(h.store.get_str(&h.key("PRIMARY_PORT")).as_deref(), Some("8080"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn metadata_is_persisted_and_not_exported() {
    let h = Harness::new();

    let report = h
        .orchestrator(sh(r#"test -z "$METADATA_APPLICATION""#))
        .run(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.exit_code, 0);

    assert_eq!(h.store.get_str(&h.key("metadata/application")).as_deref(), Some("web"));
    assert_eq!(
        h.store.get_str(&h.key("metadata/command")).as_deref(),
        Some(r#"sh -c test -z "$METADATA_APPLICATION""#)
    );
    assert_eq!(h.store.get_str(&h.key("metadata/host/hostname")).as_deref(), Some("test-host"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn drift_reloads_the_child_when_enabled() {
    let h = Harness::new();
    let mut cfg = cmd(&["sleep", "30"]);
    cfg.reload = true;
    let (mut progress, shutdown, task) = h.start(cfg);

    wait_for(&mut progress, |s| s.spawned == 1).await;
    h.store.set(&h.key("FOO"), "2");
    let stats = wait_for(&mut progress, |s| s.spawned == 2).await;
    assert_eq!(stats.retired, 1);

    shutdown.cancel();
    let report = task.await.unwrap().unwrap();
    assert_eq!(report.reason, StopReason::Shutdown);
    assert_eq!(report.exit_code, 128 + 15);
    assert_eq!(report.stats.spawned, 2);
    assert_eq!(report.stats.retired, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn identical_snapshot_is_skipped() {
    let h = Harness::new();
    let mut cfg = cmd(&["sleep", "30"]);
    cfg.reload = true;
    let (mut progress, shutdown, task) = h.start(cfg);

    wait_for(&mut progress, |s| s.spawned == 1).await;
    h.store.set(&h.key("FOO"), "1");
    let target = h.store.index();
    let stats = wait_for(&mut progress, |s| s.last_index >= target).await;
    assert_eq!(stats.spawned, 1);
    assert_eq!(stats.retired, 0);
    assert!(stats.unchanged >= 1);

    shutdown.cancel();
    let report = task.await.unwrap().unwrap();
    assert_eq!(report.stats.spawned, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn drift_is_ignored_when_reload_disabled() {
    let h = Harness::new();
    let (mut progress, shutdown, task) = h.start(cmd(&["sleep", "30"]));

    wait_for(&mut progress, |s| s.spawned == 1).await;
    h.store.set(&h.key("FOO"), "2");
    let target = h.store.index();
    let stats = wait_for(&mut progress, |s| s.last_index >= target).await;
    assert_eq!(stats.spawned, 1);
    assert_eq!(stats.ignored_drift, 1);

    shutdown.cancel();
    let report = task.await.unwrap().unwrap();
    assert_eq!(report.reason, StopReason::Shutdown);
    assert_eq!(report.stats.retired, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn resolution_failure_aborts_with_errexit() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("notify.log");
    let h = Harness::new().with_notify_file(&log);

    let mut cfg = cmd(&["true"]);
    cfg.links = vec![ServiceLink::new("db", "primary")];
    cfg.errexit = true;
    let err = h.orchestrator(cfg).run(CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, OrchestratorError::Resolve(ResolveError::NotFound { .. })));
    assert_eq!(err.exit_code(), 111);
    let content = std::fs::read_to_string(&log).unwrap();
    assert!(content.starts_with("[web - error] supervision failed"), "{content}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unhealthy_service_is_skipped_without_errexit() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("notify.log");
    let h = Harness::new().with_notify_file(&log);
    register_web(&h.catalog, "critical");

    let mut cfg = sh(r#"test -z "$PRIMARY_HOST""#);
    cfg.links = vec![ServiceLink::new("web", "primary")];
    let report = h.orchestrator(cfg).run(CancellationToken::new()).await.unwrap();

    assert_eq!(report.exit_code, 0);
    assert_eq!(h.store.get_str(&h.key("PRIMARY_HOST")), None);
    let content = std::fs::read_to_string(&log).unwrap();
    assert!(content.starts_with("[web - warning] service unresolved: web:primary"), "{content}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_store_at_startup_is_fatal() {
    let h = Harness::new();
    h.store.inject_failures(1);

    let err = h.orchestrator(cmd(&["true"])).run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Watch(WatchError::Initial(_))));
    assert_eq!(err.exit_code(), 111);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exhausted_watch_is_fatal() {
    let h = Harness::new();
    let orch = h
        .orchestrator(cmd(&["sleep", "30"]))
        .with_retry_policy(RetryPolicy::new(1, Duration::from_millis(10)));
    let mut progress = orch.progress();
    let task = tokio::spawn(orch.run(CancellationToken::new()));

    wait_for(&mut progress, |s| s.spawned == 1).await;
    h.store.inject_failures(100);
    h.store.set(&h.key("FOO"), "2");

    let err = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Watch(WatchError::Exhausted { .. })));
    assert_eq!(err.exit_code(), 111);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spawn_failure_is_fatal() {
    let h = Harness::new();

    let err = h
        .orchestrator(cmd(&["/nonexistent/iron-agentd-test-binary"]))
        .run(CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Exec(ExecError::Spawn { .. })));
    assert_eq!(err.exit_code(), 111);
}
