use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::cmp::Ordering;
use tracing::info;

use super::{evaluate_view, ViewQuery};
use crate::{error::ApiResult, AppState, RanchAggregate};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/fleet/ranches", get(handler))
}

/// Which status `only_failing` looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RanchView {
    Base,
    #[default]
    Adjusted,
}

#[derive(Debug, Default, Deserialize)]
pub struct RanchFilter {
    #[serde(default)]
    view: RanchView,
    #[serde(default)]
    only_failing: bool,
}

async fn handler(
    State(state): State<AppState>,
    Query(view): Query<ViewQuery>,
    Query(filter): Query<RanchFilter>,
) -> ApiResult<Json<Vec<RanchAggregate>>> {
    // ---
    info!("GET /fleet/ranches - {:?}", filter);

    let report = evaluate_view(&state, &view).await?;
    Ok(Json(worst_first(report.ranches, &filter)))
}

/// Failing ranches first, then by adjusted and base OK percentage
/// (highest first) and ranch id.
pub(super) fn worst_first(mut ranches: Vec<RanchAggregate>, filter: &RanchFilter) -> Vec<RanchAggregate> {
    // ---
    if filter.only_failing {
        ranches.retain(|r| match filter.view {
            RanchView::Base => !r.ranch_ok,
            RanchView::Adjusted => !r.ranch_ok_adjusted,
        });
    }

    ranches.sort_by(|a, b| {
        a.ranch_ok_adjusted
            .cmp(&b.ranch_ok_adjusted)
            .then_with(|| desc(a.pct_ok_adjusted, b.pct_ok_adjusted))
            .then_with(|| desc(a.pct_ok, b.pct_ok))
            .then_with(|| a.ranch_id.cmp(&b.ranch_id))
    });
    ranches
}

fn desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
