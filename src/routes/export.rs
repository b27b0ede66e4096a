//! CSV downloads of the evaluated devices and ranches.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::info;

use super::{evaluate_view, ranches, ViewQuery};
use crate::{
    error::{ApiError, ApiResult},
    export, AppState,
};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/fleet/export/devices.csv", get(devices_csv))
        .route("/fleet/export/ranches.csv", get(ranches_csv))
}

fn csv_response(filename: String, body: Vec<u8>) -> impl IntoResponse {
    // ---
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
}

async fn devices_csv(
    State(state): State<AppState>,
    Query(view): Query<ViewQuery>,
) -> ApiResult<impl IntoResponse> {
    // ---
    info!("GET /fleet/export/devices.csv");

    let report = evaluate_view(&state, &view).await?;
    let mut body = Vec::new();
    export::write_devices(&mut body, &report.devices)
        .map_err(|e| ApiError::Export(e.to_string()))?;

    let window = report.summary.profile.grace_window_days();
    Ok(csv_response(export::device_export_filename(window), body))
}

async fn ranches_csv(
    State(state): State<AppState>,
    Query(view): Query<ViewQuery>,
) -> ApiResult<impl IntoResponse> {
    // ---
    info!("GET /fleet/export/ranches.csv");

    let report = evaluate_view(&state, &view).await?;
    let rows = ranches::worst_first(report.ranches, &Default::default());
    let mut body = Vec::new();
    export::write_ranches(&mut body, &rows).map_err(|e| ApiError::Export(e.to_string()))?;

    let window = report.summary.profile.grace_window_days();
    Ok(csv_response(export::ranch_export_filename(window), body))
}
