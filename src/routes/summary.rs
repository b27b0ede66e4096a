use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::{evaluate_view, ViewQuery};
use crate::{engine::FleetSummary, error::ApiResult, AppState};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/fleet/summary", get(handler))
}

#[derive(Serialize)]
struct SummaryResponse {
    evaluated_at: DateTime<Utc>,
    #[serde(flatten)]
    summary: FleetSummary,
}

async fn handler(
    State(state): State<AppState>,
    Query(view): Query<ViewQuery>,
) -> ApiResult<Json<SummaryResponse>> {
    // ---
    info!("GET /fleet/summary");

    let report = evaluate_view(&state, &view).await?;
    Ok(Json(SummaryResponse {
        evaluated_at: report.evaluated_at,
        summary: report.summary,
    }))
}
