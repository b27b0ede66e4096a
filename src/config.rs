//! Configuration loader for the `ranchwatch-fleet-health` service.
//!
//! All runtime settings are read once at startup from environment variables
//! (the caller may preload a `.env` file). This includes the default
//! evaluation profile: a malformed threshold or grace window would corrupt
//! every classification the service reports, so it aborts startup instead
//! of degrading.

use std::{env, path::PathBuf};

use anyhow::{anyhow, bail, Result};

use crate::engine::{EvaluationProfile, Preset, ProfileOverrides, ThresholdComparison};

/// Parse an optional environment variable into `$ty`.
macro_rules! parse_env_opt {
    ($lookup:expr, $var_name:expr, $ty:ty) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
    };
}

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($lookup:expr, $var_name:expr, $default:expr) => {
        parse_env_opt!($lookup, $var_name, u32).unwrap_or($default)
    };
}

/// Strongly typed application configuration.
///
/// Immutable after loading; handlers receive the default profile by value
/// and never consult the environment again.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string for the `device_facts` source.
    pub db_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Directory of CSV snapshot exports. Preferred over the database.
    pub snapshot_dir: Option<PathBuf>,

    /// File name prefix of CSV snapshots.
    pub snapshot_prefix: String,

    pub listen_port: u16,

    /// Profile applied when a request does not choose its own.
    pub profile: EvaluationProfile,
}

/// Load configuration from environment variables with defaults.
///
/// Snapshot source (at least one):
/// - `FLEET_SNAPSHOT_DIR` – directory of CSV snapshots
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `FLEET_SNAPSHOT_PREFIX` – snapshot file prefix (default: `fleet_snapshot`)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `FLEET_LISTEN_PORT` – HTTP port (default: 8080)
/// - `FLEET_PROFILE` – `dashboard`, `daily`, `legacy` or `strict` (default: `dashboard`)
/// - `FLEET_OK_DEVICE_THRESHOLD`, `FLEET_OK_RANCH_THRESHOLD` – percentages
/// - `FLEET_GRACE_WINDOW_DAYS` – 1 to 60
/// - `FLEET_THRESHOLD_COMPARISON` – `at_least` or `above`
pub fn load_from_env() -> Result<Config> {
    load_with(|name| env::var(name).ok())
}

fn load_with<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let db_url = non_empty("DATABASE_URL");
    let snapshot_dir = non_empty("FLEET_SNAPSHOT_DIR").map(PathBuf::from);
    if db_url.is_none() && snapshot_dir.is_none() {
        bail!("FLEET_SNAPSHOT_DIR or DATABASE_URL must be set in .env or environment");
    }

    let snapshot_prefix =
        non_empty("FLEET_SNAPSHOT_PREFIX").unwrap_or_else(|| "fleet_snapshot".to_string());
    let db_pool_max = parse_env_u32!(non_empty, "DB_POOL_MAX", 5);
    let listen_port = parse_env_opt!(non_empty, "FLEET_LISTEN_PORT", u16).unwrap_or(8080);

    let preset = parse_env_opt!(non_empty, "FLEET_PROFILE", Preset).unwrap_or(Preset::Dashboard);
    let overrides = ProfileOverrides {
        ok_device_threshold: parse_env_opt!(non_empty, "FLEET_OK_DEVICE_THRESHOLD", f64),
        ok_ranch_threshold: parse_env_opt!(non_empty, "FLEET_OK_RANCH_THRESHOLD", f64),
        grace_window_days: parse_env_opt!(non_empty, "FLEET_GRACE_WINDOW_DAYS", i64),
        comparison: parse_env_opt!(non_empty, "FLEET_THRESHOLD_COMPARISON", ThresholdComparison),
    };
    let profile = preset
        .profile()
        .with_overrides(&overrides)
        .map_err(|e| anyhow!("Invalid evaluation profile: {}", e))?;

    Ok(Config {
        db_url,
        db_pool_max,
        snapshot_dir,
        snapshot_prefix,
        listen_port,
        profile,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// The database password is masked.
    pub fn log_config(&self) {
        // ---
        let masked_db_url = self.db_url.as_deref().map(mask_password);

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL          : {}", masked_db_url.as_deref().unwrap_or("(unset)"));
        tracing::info!("  DB_POOL_MAX           : {}", self.db_pool_max);
        tracing::info!(
            "  FLEET_SNAPSHOT_DIR    : {}",
            self.snapshot_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "(unset)".to_string())
        );
        tracing::info!("  FLEET_SNAPSHOT_PREFIX : {}", self.snapshot_prefix);
        tracing::info!("  FLEET_LISTEN_PORT     : {}", self.listen_port);
        tracing::info!("  default profile       : {}", self.profile);
    }
}

fn mask_password(url: &str) -> String {
    // ---
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            // Skip the scheme separator in "postgres://host"
            if !url[colon_pos..].starts_with("://") {
                return format!("{}:****{}", &url[..colon_pos], &url[at_pos..]);
            }
        }
    }
    url.to_string()
}
