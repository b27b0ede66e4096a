//! Ranch rollup of evaluated devices.

use std::collections::BTreeMap;

use super::{grace, EvaluationProfile};
use crate::models::{EvaluatedDevice, RanchAggregate, RanchFailureReason};

// ---

/// `100 · ok / count`, or 0 for an empty group.
pub fn pct_of_devices(ok: usize, count: usize) -> f64 {
    // ---
    if count == 0 {
        return 0.0;
    }
    100.0 * ok as f64 / count as f64
}

#[derive(Default)]
struct RanchTally<'a> {
    ranch_name: Option<&'a str>,
    customer_name: Option<&'a str>,
    gateway_status: Option<&'a str>,
    device_count: usize,
    ok_device_count: usize,
    non_ok_recent: usize,
    all_gateways_online: bool,
}

impl<'a> RanchTally<'a> {
    fn add(&mut self, device: &'a EvaluatedDevice) {
        // ---
        if self.device_count == 0 {
            self.all_gateways_online = true;
        }
        self.device_count += 1;
        if device.device_ok {
            self.ok_device_count += 1;
        } else if device.recently_communicated {
            self.non_ok_recent += 1;
        }
        self.all_gateways_online &= device.gateway_all_online.unwrap_or(false);
        self.ranch_name = self.ranch_name.or(device.ranch_name.as_deref());
        self.customer_name = self.customer_name.or(device.customer_name.as_deref());
        self.gateway_status = self
            .gateway_status
            .or(device.ranch_gateway_overall_status.as_deref());
    }
}

/// Base aggregate for one ranch from its counts.
///
/// Adjusted fields mirror the base ones until [`grace::adjust`] runs.
/// An OK count above `device_count` is clamped to it.
pub fn base_aggregate(
    ranch_id: &str,
    device_count: usize,
    ok_device_count: usize,
    non_ok_recently_communicated_count: usize,
    profile: &EvaluationProfile,
) -> RanchAggregate {
    // ---
    let ok_device_count = ok_device_count.min(device_count);
    let pct_ok = pct_of_devices(ok_device_count, device_count);
    let ranch_ok = device_count > 0
        && profile
            .comparison()
            .passes(pct_ok, profile.ok_ranch_threshold());

    let failure_reason = match (ranch_ok, device_count) {
        (true, _) => None,
        (false, 0) => Some(RanchFailureReason::NoDevices),
        (false, _) => Some(RanchFailureReason::BelowThreshold),
    };

    RanchAggregate {
        ranch_id: ranch_id.to_string(),
        ranch_name: None,
        customer_name: None,
        device_count,
        ok_device_count,
        pct_ok,
        ranch_ok,
        failure_reason,
        non_ok_count: device_count - ok_device_count,
        non_ok_recently_communicated_count,
        adjustment_applied: false,
        ok_device_count_adjusted: ok_device_count,
        pct_ok_adjusted: pct_ok,
        ranch_ok_adjusted: ranch_ok,
        all_gateways_online: false,
        ranch_gateway_overall_status: None,
    }
}

/// Group evaluated devices by ranch and compute base and adjusted status.
///
/// Devices with a missing or blank ranch id are left out. Output is
/// ordered by ranch id.
pub fn rollup(devices: &[EvaluatedDevice], profile: &EvaluationProfile) -> Vec<RanchAggregate> {
    // ---
    let mut tallies: BTreeMap<&str, RanchTally> = BTreeMap::new();
    let mut unassigned = 0usize;

    for device in devices {
        match device.ranch_id.as_deref() {
            Some(ranch_id) if !ranch_id.trim().is_empty() => {
                tallies.entry(ranch_id).or_default().add(device)
            }
            _ => unassigned += 1,
        }
    }

    if unassigned > 0 {
        tracing::debug!(unassigned, "devices without ranch left out of rollup");
    }

    tallies
        .into_iter()
        .map(|(ranch_id, tally)| {
            let mut ranch = base_aggregate(
                ranch_id,
                tally.device_count,
                tally.ok_device_count,
                tally.non_ok_recent,
                profile,
            );
            ranch.ranch_name = tally.ranch_name.map(str::to_string);
            ranch.customer_name = tally.customer_name.map(str::to_string);
            ranch.all_gateways_online = tally.all_gateways_online;
            ranch.ranch_gateway_overall_status = tally.gateway_status.map(str::to_string);
            grace::adjust(ranch, profile)
        })
        .collect()
}
