// src/routes/health.rs
//! Liveness endpoint for the fleet health service.
//!
//! Used by container orchestrators and CI to confirm the service answers
//! HTTP. It reports which snapshot source is configured but does not load
//! the snapshot, so a missing export or an unreachable database does not
//! make the process look dead.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    source: &'static str,
}

/// Handle `GET /health`.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        source: state.source.kind(),
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
