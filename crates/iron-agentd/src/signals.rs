//! OS signal handling.
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancel `shutdown` on the first SIGINT, SIGTERM or SIGQUIT.
#[cfg(unix)]
pub fn spawn_listener(shutdown: CancellationToken) -> std::io::Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut int = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    Ok(tokio::spawn(async move {
        let name = tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = int.recv() => "SIGINT",
            _ = term.recv() => "SIGTERM",
            _ = quit.recv() => "SIGQUIT",
        };
        info!(signal = name, "shutdown signal received");
        shutdown.cancel();
    }))
}

/// Cancel `shutdown` on Ctrl-C.
#[cfg(not(unix))]
pub fn spawn_listener(shutdown: CancellationToken) -> std::io::Result<tokio::task::JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            res = tokio::signal::ctrl_c() => {
                if res.is_ok() {
                    info!("ctrl-c received");
                    shutdown.cancel();
                }
            }
        }
    }))
}
