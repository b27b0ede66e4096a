//! Fleet health classification engine.
//!
//! One call to [`evaluate`] takes an immutable snapshot of device facts, an
//! [`EvaluationProfile`] and a single evaluation instant, and produces the
//! classified devices, the ranch rollup (base and grace-adjusted) and the
//! fleet summary. Nothing here reads the clock, the environment or any
//! global state, so concurrent views over the same snapshot with different
//! profiles cannot interfere and reruns are reproducible.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::{collections::HashSet, fmt, str::FromStr};

use crate::error::ProfileError;
use crate::models::{DeviceRecord, EvaluatedDevice, RanchAggregate};

mod device;
mod grace;
mod recency;
mod rollup;
mod summary;

pub use device::{evaluate_device, is_device_ok, pct_of_expected, validity_pct};
pub use grace::{adjust, recently_communicated};
pub use recency::{ConnectionBucket, GpsFixBucket};
pub use rollup::{base_aggregate, pct_of_devices, rollup};
pub use summary::{summarize, BucketCount, FleetSummary};

pub const MIN_GRACE_WINDOW_DAYS: i64 = 1;
pub const MAX_GRACE_WINDOW_DAYS: i64 = 60;

// ---

/// How a percentage is compared against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdComparison {
    /// `value >= threshold`
    AtLeast,
    /// `value > threshold`
    Above,
}

impl ThresholdComparison {
    pub fn passes(self, value: f64, threshold: f64) -> bool {
        match self {
            ThresholdComparison::AtLeast => value >= threshold,
            ThresholdComparison::Above => value > threshold,
        }
    }
}

impl FromStr for ThresholdComparison {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "at_least" | "ge" | ">=" => Ok(ThresholdComparison::AtLeast),
            "above" | "gt" | ">" => Ok(ThresholdComparison::Above),
            other => Err(ProfileError::UnknownComparison(other.to_string())),
        }
    }
}

/// Thresholds and grace window used by one evaluation.
///
/// Constructed only through [`EvaluationProfile::new`] or a [`Preset`], so a
/// profile in hand is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationProfile {
    ok_device_threshold: f64,
    ok_ranch_threshold: f64,
    grace_window_days: i64,
    comparison: ThresholdComparison,
}

impl EvaluationProfile {
    pub fn new(
        ok_device_threshold: f64,
        ok_ranch_threshold: f64,
        grace_window_days: i64,
        comparison: ThresholdComparison,
    ) -> Result<Self, ProfileError> {
        // ---
        check_percent("ok_device_threshold", ok_device_threshold)?;
        check_percent("ok_ranch_threshold", ok_ranch_threshold)?;
        if !(MIN_GRACE_WINDOW_DAYS..=MAX_GRACE_WINDOW_DAYS).contains(&grace_window_days) {
            return Err(ProfileError::GraceWindowOutOfRange {
                days: grace_window_days,
                min: MIN_GRACE_WINDOW_DAYS,
                max: MAX_GRACE_WINDOW_DAYS,
            });
        }

        Ok(Self {
            ok_device_threshold,
            ok_ranch_threshold,
            grace_window_days,
            comparison,
        })
    }

    /// Replace whichever fields `overrides` sets and validate the result.
    pub fn with_overrides(&self, overrides: &ProfileOverrides) -> Result<Self, ProfileError> {
        // ---
        Self::new(
            overrides.ok_device_threshold.unwrap_or(self.ok_device_threshold),
            overrides.ok_ranch_threshold.unwrap_or(self.ok_ranch_threshold),
            overrides.grace_window_days.unwrap_or(self.grace_window_days),
            overrides.comparison.unwrap_or(self.comparison),
        )
    }

    pub fn ok_device_threshold(&self) -> f64 {
        self.ok_device_threshold
    }

    pub fn ok_ranch_threshold(&self) -> f64 {
        self.ok_ranch_threshold
    }

    pub fn grace_window_days(&self) -> i64 {
        self.grace_window_days
    }

    pub fn grace_window(&self) -> Duration {
        Duration::days(self.grace_window_days)
    }

    pub fn comparison(&self) -> ThresholdComparison {
        self.comparison
    }
}

impl Default for EvaluationProfile {
    fn default() -> Self {
        Preset::Dashboard.profile()
    }
}

impl fmt::Display for EvaluationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.comparison {
            ThresholdComparison::AtLeast => ">=",
            ThresholdComparison::Above => ">",
        };
        write!(
            f,
            "device {op}{}%, ranch {op}{}%, grace {}d",
            self.ok_device_threshold, self.ok_ranch_threshold, self.grace_window_days
        )
    }
}

fn check_percent(name: &'static str, value: f64) -> Result<(), ProfileError> {
    // NaN fails the range check too
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ProfileError::ThresholdOutOfRange { name, value })
    }
}

/// Optional per-view replacements for profile fields.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileOverrides {
    pub ok_device_threshold: Option<f64>,
    pub ok_ranch_threshold: Option<f64>,
    pub grace_window_days: Option<i64>,
    pub comparison: Option<ThresholdComparison>,
}

/// Named profiles matching the reporting rules used over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Interactive dashboard: both thresholds at 50%.
    Dashboard,
    /// Daily reports: devices at 60%, ranches at 70%.
    Daily,
    /// Early extraction reports, strict comparison at 60% / 70%.
    Legacy,
    Strict,
}

impl Preset {
    pub fn profile(self) -> EvaluationProfile {
        // ---
        let (device, ranch, comparison) = match self {
            Preset::Dashboard => (50.0, 50.0, ThresholdComparison::AtLeast),
            Preset::Daily => (60.0, 70.0, ThresholdComparison::AtLeast),
            Preset::Legacy => (60.0, 70.0, ThresholdComparison::Above),
            Preset::Strict => (70.0, 70.0, ThresholdComparison::AtLeast),
        };
        EvaluationProfile {
            ok_device_threshold: device,
            ok_ranch_threshold: ranch,
            grace_window_days: 3,
            comparison,
        }
    }
}

impl FromStr for Preset {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dashboard" => Ok(Preset::Dashboard),
            "daily" => Ok(Preset::Daily),
            "legacy" => Ok(Preset::Legacy),
            "strict" => Ok(Preset::Strict),
            other => Err(ProfileError::UnknownPreset(other.to_string())),
        }
    }
}

/// Everything one evaluation pass produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetReport {
    pub evaluated_at: DateTime<Utc>,
    pub devices: Vec<EvaluatedDevice>,
    pub ranches: Vec<RanchAggregate>,
    pub summary: FleetSummary,
    /// Rows dropped because their device id was already seen.
    pub duplicate_rows: usize,
}

/// Classify a snapshot with one profile at one instant.
pub fn evaluate(
    snapshot: &[DeviceRecord],
    profile: &EvaluationProfile,
    now: DateTime<Utc>,
) -> FleetReport {
    // ---
    let mut seen: HashSet<&str> = HashSet::with_capacity(snapshot.len());
    let mut duplicate_rows = 0;

    let devices: Vec<EvaluatedDevice> = snapshot
        .iter()
        .filter(|record| {
            if seen.insert(record.device_id.as_str()) {
                true
            } else {
                tracing::warn!(device_id = %record.device_id, "duplicate device row skipped");
                duplicate_rows += 1;
                false
            }
        })
        .map(|record| evaluate_device(record, profile, now))
        .collect();

    let ranches = rollup(&devices, profile);
    let summary = summarize(&devices, &ranches, profile);

    tracing::debug!(
        %profile,
        devices = devices.len(),
        ranches = ranches.len(),
        promoted = summary.promoted_count,
        "evaluation complete"
    );

    FleetReport {
        evaluated_at: now,
        devices,
        ranches,
        summary,
        duplicate_rows,
    }
}
