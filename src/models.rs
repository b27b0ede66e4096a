//! Row types flowing through the fleet health engine.
//!
//! [`DeviceRecord`] is one row of the extracted fact snapshot. Every column
//! except `device_id` is optional: the extraction layer sometimes omits
//! fields, and cells that fail to parse are read as absent instead of
//! rejecting the whole snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::engine::{ConnectionBucket, GpsFixBucket};

// ---

/// Per-device facts as of one reporting instant.
#[derive(Debug, Clone, Default, Deserialize, sqlx::FromRow)]
pub struct DeviceRecord {
    // ---
    pub device_id: String,

    #[serde(default, deserialize_with = "non_empty_text")]
    pub ranch_id: Option<String>,
    #[serde(default, deserialize_with = "non_empty_text")]
    pub ranch_name: Option<String>,
    #[serde(default, deserialize_with = "non_empty_text")]
    pub customer_name: Option<String>,

    /// Messages the device should have sent in the evaluation window.
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub expected_messages: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub messages_received: Option<i64>,
    /// Accepted GPS fixes in the evaluation window.
    #[serde(default, deserialize_with = "lenient_count")]
    pub valid_positions_count: Option<i64>,

    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub last_valid_gps_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub battery_pct: Option<f64>,
    #[serde(default, deserialize_with = "loose_flag")]
    pub gateway_all_online: Option<bool>,
    /// Ranch-level gateway label from the extraction (`sin_gateway`,
    /// `todas_conectadas`, ...). Passed through untouched.
    #[serde(default, deserialize_with = "non_empty_text")]
    pub ranch_gateway_overall_status: Option<String>,
}

/// A device record after classification.
///
/// Flat on purpose: it is written one column per field to CSV exports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedDevice {
    // ---
    pub device_id: String,
    pub ranch_id: Option<String>,
    pub ranch_name: Option<String>,
    pub customer_name: Option<String>,
    pub expected_messages: Option<f64>,
    pub messages_received: Option<i64>,
    pub valid_positions_count: Option<i64>,
    /// `None` when the expected-message baseline is missing or zero.
    pub validity_pct: Option<f64>,
    pub received_pct: Option<f64>,
    pub device_ok: bool,
    pub last_message_at: Option<DateTime<Utc>>,
    pub connection_bucket: ConnectionBucket,
    pub recently_communicated: bool,
    pub last_valid_gps_at: Option<DateTime<Utc>>,
    pub gps_fix_bucket: GpsFixBucket,
    pub battery_pct: Option<f64>,
    pub gateway_all_online: Option<bool>,
    pub ranch_gateway_overall_status: Option<String>,
}

/// Why a ranch failed its base evaluation. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RanchFailureReason {
    #[serde(rename = "below-threshold device OK ratio")]
    BelowThreshold,
    #[serde(rename = "no devices")]
    NoDevices,
}

impl fmt::Display for RanchFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RanchFailureReason::BelowThreshold => f.write_str("below-threshold device OK ratio"),
            RanchFailureReason::NoDevices => f.write_str("no devices"),
        }
    }
}

/// Per-ranch rollup, base and grace-adjusted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RanchAggregate {
    // ---
    pub ranch_id: String,
    pub ranch_name: Option<String>,
    pub customer_name: Option<String>,

    pub device_count: usize,
    pub ok_device_count: usize,
    pub pct_ok: f64,
    pub ranch_ok: bool,
    pub failure_reason: Option<RanchFailureReason>,

    pub non_ok_count: usize,
    pub non_ok_recently_communicated_count: usize,
    pub adjustment_applied: bool,
    pub ok_device_count_adjusted: usize,
    pub pct_ok_adjusted: f64,
    pub ranch_ok_adjusted: bool,

    /// True only when every device reports all of its gateways online.
    pub all_gateways_online: bool,
    /// First gateway status label reported by the ranch's devices.
    pub ranch_gateway_overall_status: Option<String>,
}

// ---

/// Blank or whitespace-only text is treated as absent.
fn non_empty_text<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Counts exported as floats (`55.0`) are accepted when integral; other
/// non-numeric cells are absent.
fn lenient_count<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.as_deref().and_then(parse_count))
}

fn parse_count(raw: &str) -> Option<i64> {
    // ---
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let value: f64 = raw.parse().ok()?;
    let integral = value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15;
    integral.then_some(value as i64)
}

/// Accepts the truthy spellings seen in extracted snapshots; anything
/// unrecognised is absent rather than an error.
fn loose_flag<'de, D>(de: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.and_then(|s| match s.trim().to_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "si" | "sí" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }))
}
