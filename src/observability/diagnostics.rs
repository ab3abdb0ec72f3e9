//! Diagnostic HTTP endpoint.
//!
//! Enabled by `PROFILING`, bound to `-P` (default `:6060`). Serves process
//! status, the launched router table and the Prometheus exposition. Its
//! failures are logged and never affect routers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::routing::Router;

pub const DEFAULT_ADDR: &str = ":6060";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterSummary {
    pub name: String,
    pub listen: String,
    pub scheme: String,
    pub chain: Vec<String>,
    pub target: Option<String>,
}

impl From<&Router> for RouterSummary {
    fn from(router: &Router) -> Self {
        Self {
            name: router.name().to_string(),
            listen: format!("{}://{}", router.listen().scheme(), router.listen().authority()),
            scheme: router.scheme().to_string(),
            chain: router.chain().iter().map(ToString::to_string).collect(),
            target: router
                .target()
                .map(|target| format!("{}@{}", target.path(), target.url())),
        }
    }
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub name: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub routers: usize,
}

#[derive(Clone)]
pub struct DiagnosticsState {
    started: Instant,
    routers: Arc<Vec<RouterSummary>>,
    metrics: Option<PrometheusHandle>,
}

impl DiagnosticsState {
    pub fn new(routers: &[Router], metrics: Option<PrometheusHandle>) -> Self {
        Self {
            started: Instant::now(),
            routers: Arc::new(routers.iter().map(RouterSummary::from).collect()),
            metrics,
        }
    }
}

pub fn router(state: DiagnosticsState) -> axum::Router {
    axum::Router::new()
        .route("/debug/status", get(get_status))
        .route("/debug/routers", get(get_routers))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

/// `:6060` binds every interface.
pub fn normalize_addr(raw: &str) -> String {
    if raw.starts_with(':') {
        format!("0.0.0.0{raw}")
    } else {
        raw.to_string()
    }
}

/// Serve the endpoint in the background.
pub fn spawn(addr: &str, state: DiagnosticsState) -> JoinHandle<()> {
    let addr = normalize_addr(addr);
    tokio::spawn(async move {
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::warn!(address = %addr, error = %e, "Diagnostic endpoint failed to bind");
                return;
            }
        };

        tracing::info!(address = %addr, "Diagnostic endpoint listening");
        if let Err(e) = axum::serve(listener, router(state)).await {
            tracing::warn!(address = %addr, error = %e, "Diagnostic endpoint stopped");
        }
    })
}

async fn get_status(State(state): State<DiagnosticsState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started.elapsed().as_secs(),
        routers: state.routers.len(),
    })
}

async fn get_routers(State(state): State<DiagnosticsState>) -> Json<Vec<RouterSummary>> {
    Json(state.routers.as_ref().clone())
}

async fn get_metrics(State(state): State<DiagnosticsState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics recorder not installed").into_response(),
    }
}
