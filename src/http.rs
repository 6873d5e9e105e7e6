//! Prometheus scrape endpoint.
//!
//! Only started when `[metrics] port` is set. Serves `GET /metrics` in the
//! text exposition format.

use axum::{Router, routing::get};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Build the router serving `/metrics`.
pub fn router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serve the router on an already bound listener until it fails.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    axum::serve(listener, router()).await
}

/// Bind `0.0.0.0:port` and serve. Errors are logged, never returned.
pub async fn run_http_server(port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "Failed to bind metrics endpoint");
            return;
        }
    };
    info!(%addr, "Metrics endpoint listening");

    if let Err(e) = serve(listener).await {
        error!(error = %e, "Metrics endpoint stopped");
    }
}
