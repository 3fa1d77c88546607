//! Axum router for the bridge listener.
//!
//! `/v1/bridge` upgrades to the page WebSocket; the rest are ops endpoints.

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/bridge", get(transport::ws::bridge_upgrade))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
