//! Error types for the fleet health service.
//!
//! The classification engine itself never fails on data: malformed facts
//! degrade to conservative results. The only engine error is a malformed
//! [`EvaluationProfile`](crate::engine::EvaluationProfile), which is rejected
//! at construction. Snapshot loading and the HTTP layer add their own
//! variants on top.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::path::PathBuf;

// ---

/// Rejected evaluation profile settings.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProfileError {
    #[error("{name} must be a percentage within [0, 100], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("grace window must be between {min} and {max} days, got {days}")]
    GraceWindowOutOfRange { days: i64, min: i64, max: i64 },

    #[error("unknown evaluation profile '{0}' (expected dashboard, daily, legacy or strict)")]
    UnknownPreset(String),

    #[error("unknown threshold comparison '{0}' (expected at_least or above)")]
    UnknownComparison(String),
}

/// Failure to obtain a device fact snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("no snapshot matching '{prefix}*.csv' in {}", .dir.display())]
    NotFound { dir: PathBuf, prefix: String },

    #[error("failed to read snapshot directory {}: {source}", .dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("snapshot loader task failed: {0}")]
    Join(String),
}

/// Error surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("invalid query parameter: {0}")]
    BadRequest(String),

    #[error("export failed: {0}")]
    Export(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        match self {
            ApiError::Profile(_) | ApiError::BadRequest(_) => {
                tracing::warn!(error = %self, "rejected request");
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            ApiError::Snapshot(_) | ApiError::Export(_) => {
                tracing::error!(error = %self, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
