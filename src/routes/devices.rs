use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::cmp::Reverse;
use tracing::info;

use super::{evaluate_view, ViewQuery};
use crate::{
    engine::ConnectionBucket,
    error::{ApiError, ApiResult},
    AppState, EvaluatedDevice,
};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/fleet/devices", get(handler))
}

/// Device-level filters for `GET /fleet/devices`.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceFilter {
    ranch_id: Option<String>,
    /// Connection bucket slug or label, e.g. `24_48h`.
    connection: Option<String>,
    #[serde(default)]
    only_failing: bool,
    limit: Option<usize>,
}

async fn handler(
    State(state): State<AppState>,
    Query(view): Query<ViewQuery>,
    Query(filter): Query<DeviceFilter>,
) -> ApiResult<Json<Vec<EvaluatedDevice>>> {
    // ---
    info!("GET /fleet/devices - {:?}", filter);

    let connection = filter
        .connection
        .as_deref()
        .map(str::parse::<ConnectionBucket>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let report = evaluate_view(&state, &view).await?;
    Ok(Json(apply_filters(report.devices, &filter, connection)))
}

/// Most recently heard devices first; never-heard devices last.
fn apply_filters(
    mut devices: Vec<EvaluatedDevice>,
    filter: &DeviceFilter,
    connection: Option<ConnectionBucket>,
) -> Vec<EvaluatedDevice> {
    // ---
    devices.sort_by(|a, b| {
        (Reverse(a.last_message_at.is_some()), Reverse(a.last_message_at), &a.device_id).cmp(&(
            Reverse(b.last_message_at.is_some()),
            Reverse(b.last_message_at),
            &b.device_id,
        ))
    });

    devices
        .into_iter()
        .filter(|d| {
            filter
                .ranch_id
                .as_ref()
                .map_or(true, |id| d.ranch_id.as_ref() == Some(id))
        })
        .filter(|d| connection.map_or(true, |bucket| d.connection_bucket == bucket))
        .filter(|d| !filter.only_failing || !d.device_ok)
        .take(filter.limit.unwrap_or(1000))
        .collect()
}
