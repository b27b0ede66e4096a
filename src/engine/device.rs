//! Device health evaluation.
//!
//! A device is OK when the share of its expected messages that produced an
//! accepted GPS fix reaches the profile's device threshold. Bad or missing
//! numbers never fail the evaluation; they simply leave the device not-OK.

use chrono::{DateTime, Utc};

use super::{grace, EvaluationProfile, ConnectionBucket, GpsFixBucket};
use crate::models::{DeviceRecord, EvaluatedDevice};

// ---

/// Round to two decimals, half away from zero.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `100 · count / expected`, rounded to two decimals.
///
/// Undefined when the baseline is missing, non-finite or not positive.
/// A missing or negative count is read as zero.
pub fn pct_of_expected(count: Option<i64>, expected_messages: Option<f64>) -> Option<f64> {
    // ---
    let expected = expected_messages.filter(|e| e.is_finite() && *e > 0.0)?;
    let count = count.unwrap_or(0).max(0) as f64;
    Some(round2(100.0 * count / expected))
}

/// Validity ratio of accepted GPS fixes against the expected cadence.
pub fn validity_pct(expected_messages: Option<f64>, valid_positions_count: Option<i64>) -> Option<f64> {
    pct_of_expected(valid_positions_count, expected_messages)
}

/// An undefined ratio is never OK, whatever the threshold.
pub fn is_device_ok(validity_pct: Option<f64>, profile: &EvaluationProfile) -> bool {
    // ---
    validity_pct.is_some_and(|pct| {
        profile
            .comparison()
            .passes(pct, profile.ok_device_threshold())
    })
}

/// Classify one device against `profile` as of `now`.
pub fn evaluate_device(
    record: &DeviceRecord,
    profile: &EvaluationProfile,
    now: DateTime<Utc>,
) -> EvaluatedDevice {
    // ---
    let validity = validity_pct(record.expected_messages, record.valid_positions_count);

    EvaluatedDevice {
        device_id: record.device_id.clone(),
        ranch_id: record.ranch_id.clone(),
        ranch_name: record.ranch_name.clone(),
        customer_name: record.customer_name.clone(),
        expected_messages: record.expected_messages,
        messages_received: record.messages_received,
        valid_positions_count: record.valid_positions_count,
        validity_pct: validity,
        received_pct: pct_of_expected(record.messages_received, record.expected_messages),
        device_ok: is_device_ok(validity, profile),
        last_message_at: record.last_message_at,
        connection_bucket: ConnectionBucket::classify(record.last_message_at, now),
        recently_communicated: grace::recently_communicated(
            record.last_message_at,
            now,
            profile.grace_window(),
        ),
        last_valid_gps_at: record.last_valid_gps_at,
        gps_fix_bucket: GpsFixBucket::classify(record.last_valid_gps_at, now),
        battery_pct: record.battery_pct,
        gateway_all_online: record.gateway_all_online,
        ranch_gateway_overall_status: record.ranch_gateway_overall_status.clone(),
    }
}
