//! SQLite-backed event store

use super::{EventStore, EventStream, StoreError};
use async_trait::async_trait;
use futures::StreamExt;
use rigstream_common::time::{format_timestamp, parse_timestamp};
use rigstream_common::{DerivedFields, DrillingEvent, RawSample};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::trace;

const INSERT_EVENT: &str = r#"
    INSERT INTO drilling_events (
        timestamp, bit_depth, wobs, rpm, torque, flow_rate, mud_density,
        annular_pressure, predicted_rop, mechanical_sticking_alert,
        differential_sticking_alert, hole_cleaning_alert, mud_loss_alert
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const SELECT_RECENT: &str = r#"
    SELECT timestamp, bit_depth, wobs, rpm, torque, flow_rate, mud_density,
           annular_pressure, predicted_rop, mechanical_sticking_alert,
           differential_sticking_alert, hole_cleaning_alert, mud_loss_alert
    FROM drilling_events
    ORDER BY timestamp DESC, rowid DESC
    LIMIT ?
"#;

const SELECT_ALL: &str = r#"
    SELECT timestamp, bit_depth, wobs, rpm, torque, flow_rate, mud_density,
           annular_pressure, predicted_rop, mechanical_sticking_alert,
           differential_sticking_alert, hole_cleaning_alert, mud_loss_alert
    FROM drilling_events
    ORDER BY timestamp DESC, rowid DESC
"#;

/// One `drilling_events` row in column order
type EventRow = (
    String,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    bool,
    bool,
    bool,
    bool,
);

fn row_to_event(row: EventRow) -> Result<DrillingEvent, StoreError> {
    let (
        timestamp,
        bit_depth,
        wob,
        rpm,
        torque,
        flow_rate,
        mud_density,
        annular_pressure,
        predicted_rop,
        mechanical_sticking,
        differential_sticking,
        hole_cleaning,
        mud_loss,
    ) = row;

    let timestamp = parse_timestamp(&timestamp).map_err(|e| StoreError::Corrupt(e.to_string()))?;

    Ok(DrillingEvent::new(
        timestamp,
        RawSample {
            bit_depth,
            wob,
            rpm,
            torque,
            flow_rate,
            mud_density,
            annular_pressure,
        },
        DerivedFields {
            predicted_rop,
            mechanical_sticking,
            differential_sticking,
            hole_cleaning,
            mud_loss,
        },
    ))
}

/// Event store over the `drilling_events` table
pub struct SqliteEventStore {
    pool: SqlitePool,
    /// Serializes appends from concurrent callers
    write_lock: Mutex<()>,
}

impl SqliteEventStore {
    /// Wrap a pool whose schema was created by `rigstream_common::db::init_database`
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn append(&self, event: &DrillingEvent) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let sample = &event.sample;
        let derived = &event.derived;
        sqlx::query(INSERT_EVENT)
            .bind(format_timestamp(&event.timestamp))
            .bind(sample.bit_depth)
            .bind(sample.wob)
            .bind(sample.rpm)
            .bind(sample.torque)
            .bind(sample.flow_rate)
            .bind(sample.mud_density)
            .bind(sample.annular_pressure)
            .bind(derived.predicted_rop)
            .bind(derived.mechanical_sticking)
            .bind(derived.differential_sticking)
            .bind(derived.hole_cleaning)
            .bind(derived.mud_loss)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        trace!("Appended event at {}", format_timestamp(&event.timestamp));
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<DrillingEvent>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, EventRow>(SELECT_RECENT)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        rows.into_iter().map(row_to_event).collect()
    }

    fn all(&self) -> EventStream {
        let pool = self.pool.clone();
        Box::pin(async_stream::stream! {
            let mut rows = sqlx::query_as::<_, EventRow>(SELECT_ALL).fetch(&pool);
            while let Some(row) = rows.next().await {
                let event = row
                    .map_err(|e| StoreError::ReadFailed(e.to_string()))
                    .and_then(row_to_event);
                let failed = event.is_err();
                yield event;
                if failed {
                    break;
                }
            }
        })
    }
}
