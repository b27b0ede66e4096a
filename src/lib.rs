//! Fleet health classification for ranch GPS trackers.
//!
//! The [`engine`] module holds the classification logic and is free of I/O.
//! Around it sit the snapshot sources, CSV export, configuration and the
//! axum routes that make up the reporting service binary.

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod models;
pub mod routes;
pub mod schema;
pub mod snapshot;

pub use config::Config;
pub use engine::{evaluate, EvaluationProfile, FleetReport, Preset};
pub use models::{DeviceRecord, EvaluatedDevice, RanchAggregate};
pub use snapshot::SnapshotSource;

/// Shared state handed to every route.
#[derive(Debug, Clone)]
pub struct AppState {
    pub source: SnapshotSource,
    pub default_profile: EvaluationProfile,
}
