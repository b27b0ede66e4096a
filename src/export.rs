//! Delimited exports of evaluated devices and ranches.
//!
//! One row per device or ranch, one column per field, header line first.
//! Undefined values are empty cells.

use std::io::Write;

use serde::Serialize;

use crate::models::{EvaluatedDevice, RanchAggregate};

// ---

fn write_rows<W: Write, T: Serialize>(out: W, rows: &[T]) -> Result<(), csv::Error> {
    // ---
    let mut wtr = csv::Writer::from_writer(out);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_devices<W: Write>(out: W, devices: &[EvaluatedDevice]) -> Result<(), csv::Error> {
    write_rows(out, devices)
}

pub fn write_ranches<W: Write>(out: W, ranches: &[RanchAggregate]) -> Result<(), csv::Error> {
    write_rows(out, ranches)
}

/// Attachment name for a ranch export, tagged with the grace window.
pub fn ranch_export_filename(grace_window_days: i64) -> String {
    format!("ranch_status_base_vs_adjusted_{grace_window_days}d.csv")
}

pub fn device_export_filename(grace_window_days: i64) -> String {
    format!("device_status_{grace_window_days}d.csv")
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::engine::{evaluate, Preset};
    use crate::models::DeviceRecord;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_exports_have_header_and_one_row_each() {
        // ---
        let now = Utc.with_ymd_and_hms(2025, 9, 15, 12, 0, 0).unwrap();
        let snapshot = vec![
            DeviceRecord {
                device_id: "dev-1".to_string(),
                ranch_id: Some("R1".to_string()),
                expected_messages: Some(100.0),
                valid_positions_count: Some(55),
                last_message_at: Some(now - Duration::hours(25)),
                ..Default::default()
            },
            DeviceRecord {
                device_id: "dev-2".to_string(),
                ranch_id: Some("R1".to_string()),
                expected_messages: Some(0.0),
                ..Default::default()
            },
        ];
        let report = evaluate(&snapshot, &Preset::Dashboard.profile(), now);

        let mut devices = Vec::new();
        write_devices(&mut devices, &report.devices).unwrap();
        let devices = String::from_utf8(devices).unwrap();
        let lines: Vec<_> = devices.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("device_id,ranch_id,ranch_name,"));
        assert!(lines[1].contains("55.0"), "{}", lines[1]);
        assert!(lines[1].contains("24–48h"), "{}", lines[1]);
        assert!(lines[1].contains("2025-09-14T11:00:00Z"), "{}", lines[1]);
        // Undefined ratio is an empty cell, never a number
        assert!(lines[2].contains(",,"), "{}", lines[2]);
        assert!(lines[2].contains("beyond 3 months"), "{}", lines[2]);

        let mut ranches = Vec::new();
        write_ranches(&mut ranches, &report.ranches).unwrap();
        let ranches = String::from_utf8(ranches).unwrap();
        let lines: Vec<_> = ranches.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("pct_ok_adjusted"));
        assert!(lines[1].starts_with("R1,"));
        assert!(lines[1].contains("50.0,true"), "{}", lines[1]);
    }

    #[test]
    fn test_filenames_carry_window() {
        // ---
        assert_eq!(ranch_export_filename(3), "ranch_status_base_vs_adjusted_3d.csv");
        assert_eq!(device_export_filename(14), "device_status_14d.csv");
    }
}
