//! Sources of device fact snapshots.
//!
//! The extraction jobs that populate these sources live outside this
//! service. Every reporting cycle reads the whole current snapshot afresh:
//! either every row of the `device_facts` table, or the newest CSV export
//! in a directory. CSV exports are named `<prefix>_<YYYY-MM-DD>_<HH-MM>.csv`,
//! so the lexicographically greatest matching name is the latest one.

use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use sqlx::PgPool;

use crate::{error::SnapshotError, models::DeviceRecord};

// ---

#[derive(Debug, Clone)]
pub enum SnapshotSource {
    Postgres(PgPool),
    CsvDir { dir: PathBuf, prefix: String },
}

/// One loaded snapshot and where it came from.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub origin: String,
    pub devices: Vec<DeviceRecord>,
}

impl SnapshotSource {
    /// Short name of the backing store, for health output and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SnapshotSource::Postgres(_) => "postgres",
            SnapshotSource::CsvDir { .. } => "csv",
        }
    }

    pub async fn load(&self) -> Result<Snapshot, SnapshotError> {
        // ---
        match self {
            SnapshotSource::Postgres(pool) => {
                let devices = fetch_device_facts(pool).await?;
                Ok(Snapshot {
                    origin: "device_facts".to_string(),
                    devices,
                })
            }
            SnapshotSource::CsvDir { dir, prefix } => {
                let dir = dir.clone();
                let prefix = prefix.clone();
                tokio::task::spawn_blocking(move || load_latest_csv(&dir, &prefix))
                    .await
                    .map_err(|e| SnapshotError::Join(e.to_string()))?
            }
        }
    }
}

async fn fetch_device_facts(pool: &PgPool) -> Result<Vec<DeviceRecord>, SnapshotError> {
    // ---
    let rows = sqlx::query_as::<_, DeviceRecord>(
        r#"
        SELECT
            device_id, ranch_id, ranch_name, customer_name,
            expected_messages, messages_received, valid_positions_count,
            last_message_at, last_valid_gps_at,
            battery_pct, gateway_all_online, ranch_gateway_overall_status
        FROM device_facts
        ORDER BY device_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    tracing::debug!(rows = rows.len(), "loaded device_facts");
    Ok(rows)
}

/// Newest `<prefix>*.csv` file in `dir`.
pub fn latest_csv(dir: &Path, prefix: &str) -> Result<PathBuf, SnapshotError> {
    // ---
    let io_err = |source| SnapshotError::Io {
        dir: dir.to_path_buf(),
        source,
    };

    let mut latest: Option<(String, PathBuf)> = None;
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !(name.starts_with(prefix) && name.ends_with(".csv")) {
            continue;
        }
        if latest.as_ref().map_or(true, |(best, _)| name > *best) {
            latest = Some((name, entry.path()));
        }
    }

    latest
        .map(|(_, path)| path)
        .ok_or_else(|| SnapshotError::NotFound {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
        })
}

pub fn load_latest_csv(dir: &Path, prefix: &str) -> Result<Snapshot, SnapshotError> {
    // ---
    let path = latest_csv(dir, prefix)?;
    tracing::info!("Reading snapshot {}", path.display());

    let file = fs::File::open(&path).map_err(|source| SnapshotError::Io {
        dir: dir.to_path_buf(),
        source,
    })?;
    let devices = read_csv(file).map_err(|source| SnapshotError::Csv {
        path: path.clone(),
        source,
    })?;

    Ok(Snapshot {
        origin: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        devices,
    })
}

/// Parse device rows from CSV with a header line.
///
/// Rows that cannot be read as a device at all (for example a missing
/// `device_id`) are skipped; framing and I/O errors abort the read.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<DeviceRecord>, csv::Error> {
    // ---
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut devices = Vec::new();
    for (i, row) in rdr.deserialize::<DeviceRecord>().enumerate() {
        match row {
            Ok(device) if device.device_id.is_empty() => {
                tracing::warn!("Skipping snapshot row {}: empty device_id", i + 1);
            }
            Ok(device) => devices.push(device),
            Err(e) if matches!(e.kind(), csv::ErrorKind::Deserialize { .. }) => {
                tracing::warn!("Skipping snapshot row {}: {}", i + 1, e);
            }
            Err(e) => return Err(e),
        }
    }

    tracing::debug!(rows = devices.len(), "parsed snapshot rows");
    Ok(devices)
}
