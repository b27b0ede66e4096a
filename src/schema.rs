//! Database schema management for `ranchwatch-fleet-health`.
//!
//! The service only reads `device_facts`; the extraction job owns its rows.
//! The table is created on startup so a fresh database can be pointed at
//! the service before the first extraction has run.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the `device_facts` table and its ranch index (idempotent).
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // One row per device, replaced wholesale by each extraction run
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS device_facts (
            device_id             TEXT PRIMARY KEY,
            ranch_id              TEXT,
            ranch_name            TEXT,
            customer_name         TEXT,
            expected_messages     DOUBLE PRECISION,
            messages_received     BIGINT,
            valid_positions_count BIGINT,
            last_message_at       TIMESTAMPTZ,
            last_valid_gps_at     TIMESTAMPTZ,
            battery_pct           DOUBLE PRECISION,
            gateway_all_online    BOOLEAN,
            ranch_gateway_overall_status TEXT
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Tables created before the gateway status column existed
    sqlx::query(
        r#"
        ALTER TABLE device_facts
            ADD COLUMN IF NOT EXISTS ranch_gateway_overall_status TEXT;
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_device_facts_ranch_id
            ON device_facts (ranch_id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
