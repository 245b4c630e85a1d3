use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use iron_agentd::{AgentConfig, Cli, Orchestrator, metrics_http, signals};
use iron_consul::ConsulClient;
use iron_core::{CatalogHandle, StoreHandle, SupervisorContext};
use iron_model::INTERNAL_FAILURE_EXIT_CODE;
use iron_observe::{LoggerTimeZone, NotificationSink, init_local_offset, init_logger, timezone_sync};
use iron_prometheus::PrometheusMetrics;

fn main() {
    let config = match AgentConfig::try_from(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("iron-agentd: {e}");
            std::process::exit(INTERNAL_FAILURE_EXIT_CODE);
        }
    };

    // The local offset can only be read safely while the process is single-threaded.
    if config.logger.tz == LoggerTimeZone::Local {
        init_local_offset();
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("iron-agentd: failed to start runtime: {e}");
            std::process::exit(INTERNAL_FAILURE_EXIT_CODE);
        }
    };

    let code = match runtime.block_on(run(config)) {
        Ok(code) => code,
        Err(e) => {
            error!(error = format!("{e:#}"), "agent failed");
            eprintln!("iron-agentd: {e:#}");
            INTERNAL_FAILURE_EXIT_CODE
        }
    };
    drop(runtime);
    std::process::exit(code);
}

async fn run(config: AgentConfig) -> anyhow::Result<i32> {
    // 1) logger
    init_logger(&config.logger).context("failed to initialize logger")?;
    let shutdown = CancellationToken::new();
    let tz_task = (config.logger.tz == LoggerTimeZone::Local).then(|| timezone_sync(shutdown.child_token()));
    info!(app = %config.app, prefix = %config.prefix(), command = ?config.command, "agent starting");

    // 2) notifications and metrics
    let notifier = NotificationSink::from_hook(&config.loghook).unwrap_or_else(|e| {
        warn!(hook = %config.loghook, error = %e, "notification hook unavailable, notifications disabled");
        NotificationSink::Null
    });
    let metrics = Arc::new(PrometheusMetrics::new().context("failed to register metrics")?);
    let ctx = SupervisorContext::new(&config.app)
        .with_metrics(metrics.clone())
        .with_notifier(notifier);
    info!(%ctx, "supervisor context ready");

    let metrics_task = match config.metrics_addr {
        Some(addr) => Some(
            metrics_http::serve(addr, metrics, shutdown.child_token())
                .await
                .with_context(|| format!("failed to bind metrics endpoint on {addr}"))?,
        ),
        None => None,
    };

    // 3) store and catalog
    let consul = Arc::new(ConsulClient::new(config.consul.clone()).context("invalid store address")?);
    let store: StoreHandle = consul.clone();
    let catalog: CatalogHandle = consul;

    // 4) signals
    let signal_task = signals::spawn_listener(shutdown.clone()).context("failed to install signal handlers")?;

    // 5) loop
    let orchestrator = Orchestrator::new(ctx, config.loop_config(), store, catalog);
    let code = match orchestrator.run(shutdown.clone()).await {
        Ok(report) => {
            info!(
                code = report.exit_code,
                reason = ?report.reason,
                spawned = report.stats.spawned,
                retired = report.stats.retired,
                "supervision finished"
            );
            report.exit_code
        }
        Err(e) => e.exit_code(),
    };

    shutdown.cancel();
    let _ = signal_task.await;
    for task in [metrics_task, tz_task].into_iter().flatten() {
        let _ = task.await;
    }
    Ok(code)
}
