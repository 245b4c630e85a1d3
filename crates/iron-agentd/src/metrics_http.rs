//! Prometheus text exposition over HTTP.
use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use iron_prometheus::PrometheusMetrics;
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Router exposing `GET /metrics`.
pub fn router(metrics: Arc<PrometheusMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

/// GET /metrics
async fn metrics_handler(State(metrics): State<Arc<PrometheusMetrics>>) -> Response {
    match metrics.encode_text() {
        Ok(body) => ([(header::CONTENT_TYPE, metrics.content_type())], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Bind `addr` and serve until `cancel` fires.
pub async fn serve(
    addr: SocketAddr,
    metrics: Arc<PrometheusMetrics>,
    cancel: CancellationToken,
) -> std::io::Result<JoinHandle<()>> {
    let listener = TcpListener::bind(addr).await?;
    Ok(serve_on(listener, metrics, cancel))
}

/// Serve on an already bound listener until `cancel` fires.
pub fn serve_on(listener: TcpListener, metrics: Arc<PrometheusMetrics>, cancel: CancellationToken) -> JoinHandle<()> {
    let local = listener.local_addr().ok();
    tokio::spawn(async move {
        info!(addr = ?local, "metrics endpoint listening");
        let res = axum::serve(listener, router(metrics))
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await;
        if let Err(e) = res {
            error!(error = %e, "metrics endpoint stopped");
        }
    })
}
