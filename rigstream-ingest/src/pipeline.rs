//! Ingestion Pipeline
//!
//! Every sample walks the same path, stopping at the first failure:
//!
//! ```text
//! validate -> analyze -> persist -> classify -> broadcast -> ack
//! ```
//!
//! Failures before and during persistence leave no trace: nothing is stored
//! and nothing is broadcast. Timestamping, persisting and broadcasting happen
//! inside one commit section, so every subscriber sees events in exactly the
//! order the store accepted them. Broadcasting never waits on subscribers, so
//! the commit section stays short. The commit section runs on its own task and
//! is not cancelled when the caller is.

use crate::analyzer::Analyzer;
use crate::registry::SubscriberRegistry;
use crate::store::{EventStore, StoreError};
use chrono::{DateTime, Utc};
use rigstream_common::{time, Alert, DerivedFields, DrillingEvent, Priority, RawSample};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Status string returned for every accepted sample
pub const STATUS_BROADCASTED: &str = "broadcasted";

/// Ingestion failure, reported to the caller
///
/// Per-subscriber delivery failures are handled inside the registry and never
/// show up here.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing, malformed or non-finite sample field
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Analyzer returned an error, panicked or timed out
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    /// Event store rejected the write
    #[error("persist failed: {0}")]
    PersistFailed(#[from] StoreError),
}

impl IngestError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::InvalidInput(_) => "invalid_input",
            IngestError::AnalysisFailed(_) => "analysis_failed",
            IngestError::PersistFailed(_) => "persist_failed",
        }
    }
}

/// Acknowledgment for an accepted sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestAck {
    pub status: &'static str,
    /// Names of the raised alerts, canonical order
    #[serde(rename = "alerts")]
    pub active_alerts: Vec<Alert>,
    pub priority: Priority,
}

/// Reject samples with non-finite measurements
///
/// Negative values are physically odd but accepted; judging them is the
/// analyzer's business.
pub fn validate(sample: &RawSample) -> Result<(), IngestError> {
    for (name, value) in sample.fields() {
        if !value.is_finite() {
            return Err(IngestError::InvalidInput(format!(
                "{name} must be a finite number, got {value}"
            )));
        }
    }
    Ok(())
}

/// Coordinates analyzer, store and registry for each incoming sample
///
/// Holds no per-call state. The only thing remembered between calls is the
/// last persisted timestamp, so that timestamps never go backwards when the
/// wall clock does.
pub struct IngestionPipeline {
    analyzer: Arc<dyn Analyzer>,
    analyzer_timeout: Duration,
    section: Arc<CommitSection>,
}

/// Timestamp, persist and broadcast, run on its own task
///
/// Once started, a commit finishes even if the caller goes away, so an event
/// that reaches the store always reaches the subscribers too.
struct CommitSection {
    store: Arc<dyn EventStore>,
    registry: Arc<SubscriberRegistry>,
    /// Last persisted timestamp; holding the lock is the commit section
    watermark: Mutex<Option<DateTime<Utc>>>,
}

impl IngestionPipeline {
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        store: Arc<dyn EventStore>,
        registry: Arc<SubscriberRegistry>,
        analyzer_timeout: Duration,
    ) -> Self {
        Self {
            analyzer,
            analyzer_timeout,
            section: Arc::new(CommitSection {
                store,
                registry,
                watermark: Mutex::new(None),
            }),
        }
    }

    /// Ingest one sample
    pub async fn ingest(&self, raw: RawSample) -> Result<IngestAck, IngestError> {
        validate(&raw)?;

        let derived = self.analyze(raw).await?;

        let priority = derived.priority();
        let active_alerts = derived.active_alerts();

        let event = self.commit(raw, derived).await?;

        if priority == Priority::High {
            info!(
                timestamp = %time::format_timestamp(&event.timestamp),
                bit_depth = raw.bit_depth,
                alerts = ?active_alerts,
                "HIGH priority drilling event"
            );
        }

        Ok(IngestAck {
            status: STATUS_BROADCASTED,
            active_alerts,
            priority,
        })
    }

    /// Run the analyzer on a blocking worker, bounded by the configured timeout
    ///
    /// A timed-out analyzer keeps its worker thread until it returns; its
    /// result is discarded.
    async fn analyze(&self, raw: RawSample) -> Result<DerivedFields, IngestError> {
        let analyzer = Arc::clone(&self.analyzer);
        let name = analyzer.name();
        let task = tokio::task::spawn_blocking(move || analyzer.analyze(&raw));

        let derived = match tokio::time::timeout(self.analyzer_timeout, task).await {
            Ok(Ok(Ok(derived))) => derived,
            Ok(Ok(Err(e))) => {
                warn!(analyzer = name, "Analyzer rejected sample: {}", e);
                return Err(IngestError::AnalysisFailed(e.to_string()));
            }
            Ok(Err(join_error)) => {
                error!(analyzer = name, "Analyzer task failed: {}", join_error);
                return Err(IngestError::AnalysisFailed(format!(
                    "analyzer '{name}' crashed"
                )));
            }
            Err(_) => {
                warn!(
                    analyzer = name,
                    "Analyzer exceeded {} ms",
                    self.analyzer_timeout.as_millis()
                );
                return Err(IngestError::AnalysisFailed(format!(
                    "analyzer '{name}' timed out after {} ms",
                    self.analyzer_timeout.as_millis()
                )));
            }
        };

        if !derived.predicted_rop.is_finite() {
            return Err(IngestError::AnalysisFailed(format!(
                "analyzer '{name}' produced non-finite predicted_rop"
            )));
        }

        Ok(derived)
    }

    /// Hand the event to the commit section and wait for the outcome
    async fn commit(
        &self,
        raw: RawSample,
        derived: DerivedFields,
    ) -> Result<DrillingEvent, IngestError> {
        let section = Arc::clone(&self.section);
        match tokio::spawn(async move { section.run(raw, derived).await }).await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                error!("Commit task failed: {}", join_error);
                Err(IngestError::PersistFailed(StoreError::WriteFailed(format!(
                    "commit task failed: {join_error}"
                ))))
            }
        }
    }
}

impl CommitSection {
    async fn run(
        &self,
        raw: RawSample,
        derived: DerivedFields,
    ) -> Result<DrillingEvent, IngestError> {
        let mut last = self.watermark.lock().await;

        if last.is_none() {
            *last = self.latest_persisted().await;
        }

        let now = time::now();
        let timestamp = match *last {
            Some(previous) if previous > now => previous,
            _ => now,
        };

        let event = DrillingEvent::new(timestamp, raw, derived);
        if let Err(e) = self.store.append(&event).await {
            error!("Failed to persist drilling event: {}", e);
            return Err(IngestError::PersistFailed(e));
        }
        *last = Some(timestamp);

        let reached = self.registry.broadcast(event.clone().into_live());
        debug!(
            timestamp = %time::format_timestamp(&timestamp),
            subscribers = reached,
            "Drilling event persisted and broadcast"
        );

        Ok(event)
    }

    /// Newest stored timestamp, used to seed the watermark after a restart
    async fn latest_persisted(&self) -> Option<DateTime<Utc>> {
        match self.store.recent(1).await {
            Ok(events) => events.first().map(|event| event.timestamp),
            Err(e) => {
                warn!("Could not read latest stored timestamp: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawSample {
        RawSample {
            bit_depth: 1200.0,
            wob: 20.0,
            rpm: 110.0,
            torque: 12.0,
            flow_rate: 550.0,
            mud_density: 9.6,
            annular_pressure: 900.0,
        }
    }

    #[test]
    fn test_validate_accepts_negative_values() {
        let raw = RawSample { torque: -3.0, ..sample() };
        assert!(validate(&raw).is_ok());
    }

    #[test]
    fn test_validate_rejects_nan_and_infinity() {
        let nan = RawSample { rpm: f64::NAN, ..sample() };
        let err = validate(&nan).unwrap_err();
        assert!(matches!(err, IngestError::InvalidInput(ref msg) if msg.contains("rpm")));

        let inf = RawSample { annular_pressure: f64::INFINITY, ..sample() };
        assert!(matches!(validate(&inf), Err(IngestError::InvalidInput(_))));

        let neg_inf = RawSample { wob: f64::NEG_INFINITY, ..sample() };
        let err = validate(&neg_inf).unwrap_err();
        assert!(err.to_string().contains("wobs"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(IngestError::InvalidInput(String::new()).kind(), "invalid_input");
        assert_eq!(IngestError::AnalysisFailed(String::new()).kind(), "analysis_failed");
        assert_eq!(
            IngestError::PersistFailed(StoreError::WriteFailed(String::new())).kind(),
            "persist_failed"
        );
    }

    #[test]
    fn test_ack_serialization() {
        let ack = IngestAck {
            status: STATUS_BROADCASTED,
            active_alerts: vec![Alert::HoleCleaning],
            priority: Priority::Medium,
        };
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "broadcasted",
                "alerts": ["hole_cleaning_alert"],
                "priority": "MEDIUM"
            })
        );
    }
}
