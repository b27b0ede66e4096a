//! Recency buckets for the last message and the last valid GPS fix.
//!
//! Both classifiers walk an ascending list of upper bounds and return the
//! first bucket whose bound is not exceeded. Bounds are inclusive, so a
//! device last heard from exactly 24 hours ago is still "connected today".

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::{fmt, str::FromStr};

// ---

/// How long ago a device last delivered any message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConnectionBucket {
    #[serde(rename = "connected today")]
    ConnectedToday,
    #[serde(rename = "24–48h")]
    Within48Hours,
    #[serde(rename = "48–72h")]
    Within72Hours,
    #[serde(rename = "3–7 days")]
    WithinWeek,
    #[serde(rename = "7–15 days")]
    WithinFortnight,
    #[serde(rename = "15 days–1 month")]
    WithinMonth,
    #[serde(rename = "1–3 months")]
    WithinQuarter,
    #[serde(rename = "beyond 3 months")]
    BeyondQuarter,
}

impl ConnectionBucket {
    /// Every bucket, freshest first.
    pub const ALL: [ConnectionBucket; 8] = [
        ConnectionBucket::ConnectedToday,
        ConnectionBucket::Within48Hours,
        ConnectionBucket::Within72Hours,
        ConnectionBucket::WithinWeek,
        ConnectionBucket::WithinFortnight,
        ConnectionBucket::WithinMonth,
        ConnectionBucket::WithinQuarter,
        ConnectionBucket::BeyondQuarter,
    ];

    /// Classify a last-message timestamp relative to `now`.
    ///
    /// A device that never communicated lands in [`ConnectionBucket::BeyondQuarter`].
    pub fn classify(last_message_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        // ---
        let Some(last) = last_message_at else {
            return ConnectionBucket::BeyondQuarter;
        };
        let delta = now - last;

        const BOUNDS: [(i64, ConnectionBucket); 7] = [
            (1, ConnectionBucket::ConnectedToday),
            (2, ConnectionBucket::Within48Hours),
            (3, ConnectionBucket::Within72Hours),
            (7, ConnectionBucket::WithinWeek),
            (15, ConnectionBucket::WithinFortnight),
            (30, ConnectionBucket::WithinMonth),
            (90, ConnectionBucket::WithinQuarter),
        ];

        BOUNDS
            .iter()
            .find(|(days, _)| delta <= Duration::days(*days))
            .map(|(_, bucket)| *bucket)
            .unwrap_or(ConnectionBucket::BeyondQuarter)
    }

    /// Human readable label, as exported.
    pub fn label(self) -> &'static str {
        match self {
            ConnectionBucket::ConnectedToday => "connected today",
            ConnectionBucket::Within48Hours => "24–48h",
            ConnectionBucket::Within72Hours => "48–72h",
            ConnectionBucket::WithinWeek => "3–7 days",
            ConnectionBucket::WithinFortnight => "7–15 days",
            ConnectionBucket::WithinMonth => "15 days–1 month",
            ConnectionBucket::WithinQuarter => "1–3 months",
            ConnectionBucket::BeyondQuarter => "beyond 3 months",
        }
    }

    /// ASCII identifier accepted in query strings.
    pub fn slug(self) -> &'static str {
        match self {
            ConnectionBucket::ConnectedToday => "connected_today",
            ConnectionBucket::Within48Hours => "24_48h",
            ConnectionBucket::Within72Hours => "48_72h",
            ConnectionBucket::WithinWeek => "3_7d",
            ConnectionBucket::WithinFortnight => "7_15d",
            ConnectionBucket::WithinMonth => "15d_1m",
            ConnectionBucket::WithinQuarter => "1_3m",
            ConnectionBucket::BeyondQuarter => "beyond_3m",
        }
    }
}

impl fmt::Display for ConnectionBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ConnectionBucket {
    type Err = String;

    /// Accepts either the slug or the exported label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        let wanted = s.trim();
        ConnectionBucket::ALL
            .into_iter()
            .find(|b| b.slug().eq_ignore_ascii_case(wanted) || b.label() == wanted)
            .ok_or_else(|| format!("unknown connection bucket '{wanted}'"))
    }
}

/// How long ago a device last produced an accepted GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GpsFixBucket {
    #[serde(rename = "fix today")]
    Today,
    #[serde(rename = "fix 24–48h")]
    Within48Hours,
    #[serde(rename = "fix 48–72h")]
    Within72Hours,
    #[serde(rename = "fix 3–7 days")]
    WithinWeek,
    #[serde(rename = "fix 7–15 days")]
    WithinFortnight,
    #[serde(rename = "fix 15 days–1 month")]
    WithinMonth,
    #[serde(rename = "fix 1–3 months")]
    WithinQuarter,
    #[serde(rename = "fix beyond 3 months")]
    BeyondQuarter,
    #[serde(rename = "no valid fix")]
    NoValidFix,
}

impl GpsFixBucket {
    pub fn classify(last_valid_gps_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        // ---
        let Some(last) = last_valid_gps_at else {
            return GpsFixBucket::NoValidFix;
        };
        let delta = now - last;

        const BOUNDS: [(i64, GpsFixBucket); 7] = [
            (24, GpsFixBucket::Today),
            (48, GpsFixBucket::Within48Hours),
            (72, GpsFixBucket::Within72Hours),
            (168, GpsFixBucket::WithinWeek),
            (360, GpsFixBucket::WithinFortnight),
            (720, GpsFixBucket::WithinMonth),
            (2160, GpsFixBucket::WithinQuarter),
        ];

        BOUNDS
            .iter()
            .find(|(hours, _)| delta <= Duration::hours(*hours))
            .map(|(_, bucket)| *bucket)
            .unwrap_or(GpsFixBucket::BeyondQuarter)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 15, 12, 0, 0).unwrap()
    }

    fn ago(d: Duration) -> Option<DateTime<Utc>> {
        Some(now() - d)
    }

    #[test]
    fn test_twenty_five_hours_is_second_bucket() {
        // ---
        let bucket = ConnectionBucket::classify(ago(Duration::hours(25)), now());
        assert_eq!(bucket, ConnectionBucket::Within48Hours);
        assert_eq!(bucket.label(), "24–48h");
    }

    #[test]
    fn test_never_connected_is_maximally_stale() {
        // ---
        assert_eq!(
            ConnectionBucket::classify(None, now()),
            ConnectionBucket::BeyondQuarter
        );
    }

    #[test]
    fn test_upper_bounds_are_inclusive() {
        // ---
        let cases = [
            (Duration::days(1), ConnectionBucket::ConnectedToday),
            (Duration::days(2), ConnectionBucket::Within48Hours),
            (Duration::days(3), ConnectionBucket::Within72Hours),
            (Duration::days(7), ConnectionBucket::WithinWeek),
            (Duration::days(15), ConnectionBucket::WithinFortnight),
            (Duration::days(30), ConnectionBucket::WithinMonth),
            (Duration::days(90), ConnectionBucket::WithinQuarter),
        ];
        for (delta, expected) in cases {
            assert_eq!(ConnectionBucket::classify(ago(delta), now()), expected);
            // One second later tips into the next bucket
            let next = ConnectionBucket::classify(ago(delta + Duration::seconds(1)), now());
            assert!(next > expected, "{delta:?} + 1s should be staler than {expected}");
        }
    }

    #[test]
    fn test_every_delta_lands_in_exactly_one_ordered_bucket() {
        // ---
        let mut previous = ConnectionBucket::ConnectedToday;
        for hours in 0..(24 * 120) {
            let bucket = ConnectionBucket::classify(ago(Duration::hours(hours)), now());
            assert!(ConnectionBucket::ALL.contains(&bucket));
            assert!(bucket >= previous, "buckets must not go back in time");
            previous = bucket;
        }
        assert_eq!(previous, ConnectionBucket::BeyondQuarter);
    }

    #[test]
    fn test_future_timestamp_counts_as_connected_today() {
        // ---
        let future = Some(now() + Duration::minutes(5));
        assert_eq!(
            ConnectionBucket::classify(future, now()),
            ConnectionBucket::ConnectedToday
        );
    }

    #[test]
    fn test_bucket_parses_from_slug_or_label() {
        // ---
        assert_eq!(
            "24_48h".parse::<ConnectionBucket>(),
            Ok(ConnectionBucket::Within48Hours)
        );
        assert_eq!(
            "beyond 3 months".parse::<ConnectionBucket>(),
            Ok(ConnectionBucket::BeyondQuarter)
        );
        assert!("yesterday".parse::<ConnectionBucket>().is_err());
    }

    #[test]
    fn test_gps_fix_buckets() {
        // ---
        assert_eq!(GpsFixBucket::classify(None, now()), GpsFixBucket::NoValidFix);
        assert_eq!(
            GpsFixBucket::classify(ago(Duration::hours(24)), now()),
            GpsFixBucket::Today
        );
        assert_eq!(
            GpsFixBucket::classify(ago(Duration::hours(100)), now()),
            GpsFixBucket::WithinWeek
        );
        assert_eq!(
            GpsFixBucket::classify(ago(Duration::hours(2161)), now()),
            GpsFixBucket::BeyondQuarter
        );
    }
}
