//! Fleet-wide indicators over one evaluation.

use serde::Serialize;

use super::{ConnectionBucket, EvaluationProfile};
use crate::models::{EvaluatedDevice, RanchAggregate};

// ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub bucket: ConnectionBucket,
    pub devices: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSummary {
    // ---
    pub profile: EvaluationProfile,

    pub device_count: usize,
    pub connected_today: usize,
    pub not_connected_today: usize,
    pub devices_ok: usize,
    /// Devices receiving under a quarter of their expected messages.
    pub low_ratio_count: usize,
    pub low_battery_count: usize,
    pub mean_battery_pct: Option<f64>,

    pub ranch_count: usize,
    pub ranches_ok: usize,
    pub ranches_ok_adjusted: usize,
    /// Ranches failing on base figures but OK after grace adjustment.
    pub promoted_count: usize,

    pub connection_buckets: Vec<BucketCount>,
}

pub fn summarize(
    devices: &[EvaluatedDevice],
    ranches: &[RanchAggregate],
    profile: &EvaluationProfile,
) -> FleetSummary {
    // ---
    let connection_buckets: Vec<BucketCount> = ConnectionBucket::ALL
        .into_iter()
        .map(|bucket| BucketCount {
            bucket,
            devices: devices
                .iter()
                .filter(|d| d.connection_bucket == bucket)
                .count(),
        })
        .collect();

    let connected_today = connection_buckets[0].devices;

    let batteries: Vec<f64> = devices
        .iter()
        .filter_map(|d| d.battery_pct)
        .filter(|b| b.is_finite())
        .collect();
    let mean_battery_pct = if batteries.is_empty() {
        None
    } else {
        Some(batteries.iter().sum::<f64>() / batteries.len() as f64)
    };

    FleetSummary {
        profile: *profile,
        device_count: devices.len(),
        connected_today,
        not_connected_today: devices.len() - connected_today,
        devices_ok: devices.iter().filter(|d| d.device_ok).count(),
        low_ratio_count: devices
            .iter()
            .filter(|d| d.received_pct.is_some_and(|r| r > 0.0 && r < 25.0))
            .count(),
        low_battery_count: batteries.iter().filter(|b| **b > 0.0 && **b < 20.0).count(),
        mean_battery_pct,
        ranch_count: ranches.len(),
        ranches_ok: ranches.iter().filter(|r| r.ranch_ok).count(),
        ranches_ok_adjusted: ranches.iter().filter(|r| r.ranch_ok_adjusted).count(),
        promoted_count: ranches
            .iter()
            .filter(|r| !r.ranch_ok && r.ranch_ok_adjusted)
            .count(),
        connection_buckets,
    }
}
