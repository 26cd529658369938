//! Query Service: read-only access to stored history
//!
//! [`QueryService::history`] is a bounded pass-through to the store.
//! [`QueryService::export_rows`] streams the whole store as CSV lines,
//! header first, so the export never sits in memory at once.

use crate::store::{EventStore, StoreError};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use rigstream_common::events::FIELD_NAMES;
use rigstream_common::{time, DrillingEvent};
use std::sync::Arc;

/// Lazily produced CSV lines, each terminated by `\n`
pub type RowStream = BoxStream<'static, Result<String, StoreError>>;

/// CSV header line in canonical field order
pub fn csv_header() -> String {
    let mut line = FIELD_NAMES.join(",");
    line.push('\n');
    line
}

/// One CSV line for an event
///
/// Floats use their shortest round-trip form (`22.0`, `1e300`). Alert flags
/// are written as 0/1, matching how they are stored.
pub fn csv_row(event: &DrillingEvent) -> String {
    let derived = &event.derived;
    let mut line = time::format_timestamp(&event.timestamp);
    for value in event
        .sample
        .fields()
        .into_iter()
        .map(|(_, value)| value)
        .chain([derived.predicted_rop])
    {
        line.push_str(&format!(",{value:?}"));
    }
    for flag in [
        derived.mechanical_sticking,
        derived.differential_sticking,
        derived.hole_cleaning,
        derived.mud_loss,
    ] {
        line.push_str(if flag { ",1" } else { ",0" });
    }
    line.push('\n');
    line
}

/// Read-only view over the event store
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn EventStore>,
    default_limit: u32,
    max_limit: u32,
}

impl QueryService {
    pub fn new(store: Arc<dyn EventStore>, default_limit: u32, max_limit: u32) -> Self {
        Self {
            store,
            default_limit,
            max_limit,
        }
    }

    /// Limit actually applied for a requested limit
    pub fn effective_limit(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }

    /// Most recent events, newest first
    pub async fn history(&self, limit: Option<u32>) -> Result<Vec<DrillingEvent>, StoreError> {
        self.store.recent(self.effective_limit(limit)).await
    }

    /// Whole store as CSV lines, newest first
    ///
    /// Restartable only by calling again.
    pub fn export_rows(&self) -> RowStream {
        let header = stream::once(async { Ok(csv_header()) });
        let rows = self.store.all().map_ok(|event| csv_row(&event));
        header.chain(rows).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rigstream_common::{DerivedFields, RawSample};

    #[test]
    fn test_header_matches_field_list() {
        assert_eq!(
            csv_header(),
            "timestamp,bit_depth,wobs,rpm,torque,flow_rate,mud_density,annular_pressure,\
             predicted_rop,mechanical_sticking_alert,differential_sticking_alert,\
             hole_cleaning_alert,mud_loss_alert\n"
        );
    }

    #[test]
    fn test_row_layout() {
        let event = DrillingEvent::new(
            Utc.with_ymd_and_hms(2026, 10, 18, 12, 30, 0).unwrap(),
            RawSample {
                bit_depth: 3050.25,
                wob: 22.0,
                rpm: 95.5,
                torque: 14.0,
                flow_rate: 480.0,
                mud_density: 11.1,
                annular_pressure: -2.5,
            },
            DerivedFields {
                predicted_rop: 7.75,
                mechanical_sticking: true,
                differential_sticking: false,
                hole_cleaning: true,
                mud_loss: false,
            },
        );

        assert_eq!(
            csv_row(&event),
            "2026-10-18T12:30:00.000000Z,3050.25,22.0,95.5,14.0,480.0,11.1,-2.5,7.75,1,0,1,0\n"
        );
    }

    #[test]
    fn test_row_keeps_extreme_magnitudes_short() {
        let event = DrillingEvent::new(
            Utc.with_ymd_and_hms(2026, 10, 18, 12, 30, 0).unwrap(),
            RawSample {
                bit_depth: 1e300,
                wob: 1e-7,
                rpm: 0.1,
                torque: 0.0,
                flow_rate: 480.0,
                mud_density: 11.1,
                annular_pressure: 900.0,
            },
            DerivedFields::default(),
        );

        let row = csv_row(&event);
        let fields: Vec<&str> = row.trim_end().split(',').collect();
        assert_eq!(&fields[1..5], ["1e300", "1e-7", "0.1", "0.0"]);
        assert_eq!(fields[1].parse::<f64>().unwrap(), 1e300);
    }
}
