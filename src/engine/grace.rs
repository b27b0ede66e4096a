//! Grace adjustment for failing ranches.
//!
//! A ranch that misses its threshold is credited as fully OK when every one
//! of its failing devices still talked to the network inside the grace
//! window. Partial compliance changes nothing, and an OK ranch is never
//! touched.

use chrono::{DateTime, Duration, Utc};

use super::{rollup::pct_of_devices, EvaluationProfile};
use crate::models::RanchAggregate;

// ---

/// `now - last_message_at <= window`. A device that never communicated
/// is never recent.
pub fn recently_communicated(
    last_message_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    last_message_at.is_some_and(|last| now - last <= window)
}

/// Fill the adjusted fields of a base aggregate.
pub fn adjust(mut ranch: RanchAggregate, profile: &EvaluationProfile) -> RanchAggregate {
    // ---
    ranch.adjustment_applied = !ranch.ranch_ok
        && ranch.non_ok_count > 0
        && ranch.non_ok_recently_communicated_count == ranch.non_ok_count;

    ranch.ok_device_count_adjusted = if ranch.adjustment_applied {
        ranch.device_count
    } else {
        ranch.ok_device_count
    };
    ranch.pct_ok_adjusted = pct_of_devices(ranch.ok_device_count_adjusted, ranch.device_count);
    ranch.ranch_ok_adjusted = ranch.device_count > 0
        && profile
            .comparison()
            .passes(ranch.pct_ok_adjusted, profile.ok_ranch_threshold());

    if ranch.adjustment_applied {
        tracing::debug!(
            ranch_id = %ranch.ranch_id,
            pct_ok = ranch.pct_ok,
            non_ok = ranch.non_ok_count,
            "grace adjustment promoted ranch"
        );
    }

    ranch
}
