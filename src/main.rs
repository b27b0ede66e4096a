//! Application entry point for the `ranchwatch-fleet-health` service.
//!
//! Startup sequence:
//! - Loading configuration (including the default evaluation profile) from
//!   environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Choosing the snapshot source: a CSV export directory, or PostgreSQL
//!   with the `device_facts` schema created if missing
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `FLEET_SNAPSHOT_DIR` / `DATABASE_URL` – snapshot source (one required)
//! - `FLEET_PROFILE` and `FLEET_*` threshold variables – default profile
//! - `FLEET_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `FLEET_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the complete list.
use std::{env, net::SocketAddr};

use anyhow::{Context, Result};
use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use ranchwatch_fleet_health::{config, routes, schema, AppState, SnapshotSource};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let source = match (&cfg.snapshot_dir, &cfg.db_url) {
        (Some(dir), _) => SnapshotSource::CsvDir {
            dir: dir.clone(),
            prefix: cfg.snapshot_prefix.clone(),
        },
        (None, Some(db_url)) => {
            tracing::info!("Attempting to connect to database");

            let pool = PgPoolOptions::new()
                .max_connections(cfg.db_pool_max)
                .connect(db_url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Successfully connected to database");

            schema::create_schema(&pool).await?;
            SnapshotSource::Postgres(pool)
        }
        (None, None) => anyhow::bail!("no snapshot source configured"),
    };

    tracing::info!(source = source.kind(), profile = %cfg.profile, "Snapshot source ready");

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(AppState {
        source,
        default_profile: cfg.profile,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `FLEET_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level from `RUST_LOG`, else `FLEET_LOG_LEVEL`
///
/// Call once at startup before any logging.
fn init_tracing() {
    // ---
    let span_events = match env::var("FLEET_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("FLEET_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
