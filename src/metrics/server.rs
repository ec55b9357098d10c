//! HTTP exporter for scanner metrics.
//!
//! Serves the Prometheus text format on `/metrics`, a one-word scanner state
//! on `/health`, and a human-readable counter dump on `/status`.

use crate::capture::OutputConfig;
use crate::metrics::{MetricsSnapshot, ScannerMetrics};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::cors::CorsLayer;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot bind metrics listener: {0}")]
    Bind(#[from] std::io::Error),

    #[error("metrics listener failed: {0}")]
    Serve(String),
}

/// Where the exporter listens. Loopback only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(OutputConfig::default().metrics_port)
    }
}

impl MetricsServerConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], port)),
        }
    }

    /// Exporter settings from the output section, or `None` when port 0
    /// disables it.
    pub fn from_output(output: &OutputConfig) -> Option<Self> {
        (output.metrics_port != 0).then(|| Self::with_port(output.metrics_port))
    }
}

/// Exporter bound to one screen's [`ScannerMetrics`].
pub struct MetricsServer {
    config: MetricsServerConfig,
    metrics: ScannerMetrics,
}

impl MetricsServer {
    pub fn new(config: MetricsServerConfig, metrics: ScannerMetrics) -> Self {
        Self { config, metrics }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(prometheus_text))
            .route("/health", get(scanner_health))
            .route("/status", get(scanner_status))
            .layer(CorsLayer::permissive())
            .with_state(self.metrics.clone())
    }

    /// Serves until the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` completes, then finishes in-flight requests.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Serving scanner metrics");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::debug!("Metrics exporter stopped");
        Ok(())
    }
}

async fn prometheus_text(State(metrics): State<ScannerMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (StatusCode::OK, [("content-type", PROMETHEUS_TEXT)], body),
        Err(e) => {
            tracing::warn!(error = %e, "Metrics encoding failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", TEXT_PLAIN)],
                e.to_string(),
            )
        }
    }
}

async fn scanner_health(State(metrics): State<ScannerMetrics>) -> &'static str {
    health_word(&metrics.snapshot())
}

async fn scanner_status(State(metrics): State<ScannerMetrics>) -> impl IntoResponse {
    (
        [("content-type", TEXT_PLAIN)],
        status_text(&metrics.snapshot()),
    )
}

fn health_word(snapshot: &MetricsSnapshot) -> &'static str {
    if snapshot.session_running {
        "scanning"
    } else {
        "idle"
    }
}

fn status_text(s: &MetricsSnapshot) -> String {
    format!(
        "state: {}\nsession starts: {}\nsession stops: {}\nprepare failures: {}\n\
         results shown: {}\ndetections dropped: {}\ncamera unavailable notices: {}\n",
        health_word(s),
        s.session_starts,
        s.session_stops,
        s.prepare_failures,
        s.detections_forwarded,
        s.detections_dropped,
        s.camera_unavailable,
    )
}
