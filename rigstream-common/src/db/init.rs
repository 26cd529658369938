//! Database initialization
//!
//! Opens (creating if needed) the SQLite file that backs the event store and
//! makes sure the `drilling_events` table exists. The table is append-only and
//! ordered implicitly by insertion; `priority` is deliberately not a column.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Busy timeout applied to every connection, in milliseconds
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets history/export readers proceed while an append is in flight
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    let pragma_sql = format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS);
    sqlx::query(&pragma_sql).execute(&pool).await?;

    create_drilling_events_table(&pool).await?;

    Ok(pool)
}

/// Create the drilling_events table
///
/// Columns match the canonical event field order exactly. Alert flags are
/// stored as INTEGER 0/1.
pub async fn create_drilling_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS drilling_events (
            timestamp TEXT NOT NULL,
            bit_depth REAL NOT NULL,
            wobs REAL NOT NULL,
            rpm REAL NOT NULL,
            torque REAL NOT NULL,
            flow_rate REAL NOT NULL,
            mud_density REAL NOT NULL,
            annular_pressure REAL NOT NULL,
            predicted_rop REAL NOT NULL,
            mechanical_sticking_alert INTEGER NOT NULL,
            differential_sticking_alert INTEGER NOT NULL,
            hole_cleaning_alert INTEGER NOT NULL,
            mud_loss_alert INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_drilling_events_timestamp ON drilling_events(timestamp)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
