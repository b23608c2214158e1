//! REST API over a finished scenario run.
//!
//! Provides three GET endpoints:
//! - `/state` - run timing plus each loop's KPIs and latest tick
//! - `/telemetry` - tick records with optional loop and range filtering
//! - `/optimal-start` - fitted coefficients, lead time and planned commands

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::runner::{LoopRun, OptimalStartRun, ScenarioRun};
use crate::sim::types::SimConfig;

/// Immutable application state shared across all request handlers.
///
/// Built once after the run completes and wrapped in `Arc`; all data is
/// read-only so no locking is needed.
pub struct AppState {
    pub config: SimConfig,
    pub loops: Vec<LoopRun>,
    pub optimal_start: OptimalStartRun,
}

impl From<ScenarioRun> for AppState {
    fn from(run: ScenarioRun) -> Self {
        Self {
            config: run.sim,
            loops: run.loops,
            optimal_start: run.optimal_start,
        }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/telemetry", get(handlers::get_telemetry))
        .route("/optimal-start", get(handlers::get_optimal_start))
        .with_state(state)
}

/// Binds to the given address and serves the API until the process exits.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
