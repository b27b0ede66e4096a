//! Route gateway for the fleet health service.
//!
//! Each sibling module exports a subrouter; this module merges them and
//! owns the pieces every evaluation route shares: the view query that picks
//! a profile and evaluation instant, and the single load-then-evaluate
//! step.

use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    engine::{self, EvaluationProfile, Preset, ProfileOverrides, ThresholdComparison},
    error::{ApiResult, ProfileError},
    AppState, DeviceRecord, FleetReport,
};

mod devices;
mod export;
mod health;
mod ranches;
mod summary;

// ---

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(devices::router())
        .merge(ranches::router())
        .merge(summary::router())
        .merge(export::router())
        .merge(health::router())
        .with_state(state)
}

/// Profile and clock selection shared by every evaluation route.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    profile: Option<String>,
    ok_device_threshold: Option<f64>,
    ok_ranch_threshold: Option<f64>,
    grace_window_days: Option<i64>,
    comparison: Option<String>,
    /// Restrict the run to one customer's devices.
    customer: Option<String>,
    /// Evaluation instant (RFC 3339); wall clock when absent.
    now: Option<DateTime<Utc>>,
}

impl ViewQuery {
    /// Preset named by the request (or the service default) plus overrides.
    pub fn resolve_profile(&self, default: &EvaluationProfile) -> Result<EvaluationProfile, ProfileError> {
        // ---
        let base = match self.profile.as_deref() {
            Some(name) => name.parse::<Preset>()?.profile(),
            None => *default,
        };
        let comparison = self
            .comparison
            .as_deref()
            .map(str::parse::<ThresholdComparison>)
            .transpose()?;

        base.with_overrides(&ProfileOverrides {
            ok_device_threshold: self.ok_device_threshold,
            ok_ranch_threshold: self.ok_ranch_threshold,
            grace_window_days: self.grace_window_days,
            comparison,
        })
    }
}

/// Keep only the devices of `customer`, when one is named.
///
/// Runs before evaluation so the rollup and the summary are scoped too.
fn scope_to_customer(devices: Vec<DeviceRecord>, customer: Option<&str>) -> Vec<DeviceRecord> {
    // ---
    let Some(customer) = customer.map(str::trim).filter(|c| !c.is_empty()) else {
        return devices;
    };
    devices
        .into_iter()
        .filter(|d| d.customer_name.as_deref().map(str::trim) == Some(customer))
        .collect()
}

/// Load the current snapshot and evaluate it for one view.
///
/// `now` is taken once here and shared by every device and ranch in the run.
async fn evaluate_view(state: &AppState, view: &ViewQuery) -> ApiResult<FleetReport> {
    // ---
    let profile = view.resolve_profile(&state.default_profile)?;
    let now = view.now.unwrap_or_else(Utc::now);
    let run_id = Uuid::new_v4();

    debug!(
        %run_id,
        %profile,
        %now,
        customer = view.customer.as_deref(),
        source = state.source.kind(),
        "evaluating view"
    );

    let snapshot = state.source.load().await?;
    let devices = scope_to_customer(snapshot.devices, view.customer.as_deref());
    let report = engine::evaluate(&devices, &profile, now);

    info!(
        %run_id,
        origin = %snapshot.origin,
        devices = report.devices.len(),
        ranches = report.ranches.len(),
        ranches_ok_adjusted = report.summary.ranches_ok_adjusted,
        duplicates = report.duplicate_rows,
        "evaluation run complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_view_without_parameters_uses_default() {
        // ---
        let default = Preset::Strict.profile();
        let profile = ViewQuery::default().resolve_profile(&default).unwrap();
        assert_eq!(profile, default);
    }

    #[test]
    fn test_view_preset_and_override() {
        // ---
        let view = ViewQuery {
            profile: Some("legacy".to_string()),
            ok_ranch_threshold: Some(55.0),
            comparison: Some("at_least".to_string()),
            ..Default::default()
        };
        let profile = view.resolve_profile(&Preset::Dashboard.profile()).unwrap();
        assert_eq!(profile.ok_device_threshold(), 60.0);
        assert_eq!(profile.ok_ranch_threshold(), 55.0);
        assert_eq!(profile.comparison(), ThresholdComparison::AtLeast);
    }

    #[test]
    fn test_customer_scope_keeps_matching_devices() {
        // ---
        let device = |id: &str, customer: Option<&str>| DeviceRecord {
            device_id: id.to_string(),
            customer_name: customer.map(str::to_string),
            ..Default::default()
        };
        let devices = vec![
            device("a", Some("Agro Sur")),
            device("b", Some("Ganadera Norte")),
            device("c", None),
            device("d", Some("Agro Sur ")),
        ];

        let scoped = scope_to_customer(devices.clone(), Some("Agro Sur"));
        let ids: Vec<_> = scoped.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, ["a", "d"]);

        assert_eq!(scope_to_customer(devices.clone(), None).len(), 4);
        assert_eq!(scope_to_customer(devices, Some("  ")).len(), 4);
    }

    #[test]
    fn test_view_rejects_invalid_window() {
        // ---
        let view = ViewQuery {
            grace_window_days: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            view.resolve_profile(&Preset::Dashboard.profile()),
            Err(ProfileError::GraceWindowOutOfRange { .. })
        ));
    }
}
