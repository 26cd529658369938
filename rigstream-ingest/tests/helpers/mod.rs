//! Shared fakes for rigstream-ingest integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use rigstream_common::db::init_database;
use rigstream_common::{DerivedFields, DrillingEvent, RawSample};
use rigstream_ingest::analyzer::{AnalysisError, Analyzer};
use rigstream_ingest::store::{EventStore, EventStream, SqliteEventStore, StoreError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A sample every analyzer in these tests accepts
pub fn sample(bit_depth: f64) -> RawSample {
    RawSample {
        bit_depth,
        wob: 18.5,
        rpm: 120.0,
        torque: 11.25,
        flow_rate: 620.0,
        mud_density: 10.4,
        annular_pressure: 1410.0,
    }
}

/// Derived fields with the first `count` alerts raised
pub fn derived_with_alerts(count: usize) -> DerivedFields {
    DerivedFields {
        predicted_rop: 33.5,
        mechanical_sticking: count > 0,
        differential_sticking: count > 1,
        hole_cleaning: count > 2,
        mud_loss: count > 3,
    }
}

/// Returns the same derived fields for every sample and counts calls
pub struct FixedAnalyzer {
    derived: DerivedFields,
    calls: AtomicUsize,
}

impl FixedAnalyzer {
    pub fn new(derived: DerivedFields) -> Arc<Self> {
        Arc::new(Self {
            derived,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Analyzer for FixedAnalyzer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn analyze(&self, _sample: &RawSample) -> Result<DerivedFields, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.derived)
    }
}

/// Always rejects
pub struct FailingAnalyzer;

impl Analyzer for FailingAnalyzer {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn analyze(&self, _sample: &RawSample) -> Result<DerivedFields, AnalysisError> {
        Err(AnalysisError::Rejected("sensor model unavailable".to_string()))
    }
}

/// Blocks longer than any test timeout
pub struct SlowAnalyzer(pub Duration);

impl Analyzer for SlowAnalyzer {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn analyze(&self, _sample: &RawSample) -> Result<DerivedFields, AnalysisError> {
        std::thread::sleep(self.0);
        Ok(DerivedFields::default())
    }
}

/// Panics on every call
pub struct PanickingAnalyzer;

impl Analyzer for PanickingAnalyzer {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn analyze(&self, _sample: &RawSample) -> Result<DerivedFields, AnalysisError> {
        panic!("analyzer bug");
    }
}

/// Produces a NaN rate of penetration
pub struct NanAnalyzer;

impl Analyzer for NanAnalyzer {
    fn name(&self) -> &'static str {
        "nan"
    }

    fn analyze(&self, _sample: &RawSample) -> Result<DerivedFields, AnalysisError> {
        Ok(DerivedFields {
            predicted_rop: f64::NAN,
            ..Default::default()
        })
    }
}

/// In-memory store whose writes can be made to fail
#[derive(Default)]
pub struct MemoryStore {
    events: Mutex<Vec<DrillingEvent>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn seed(&self, event: DrillingEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append(&self, event: &DrillingEvent) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed("disk full".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<DrillingEvent>, StoreError> {
        let events = self.events.lock().unwrap();
        Ok(events.iter().rev().take(limit as usize).cloned().collect())
    }

    fn all(&self) -> EventStream {
        let events: Vec<_> = self.events.lock().unwrap().iter().rev().cloned().collect();
        Box::pin(stream::iter(events.into_iter().map(Ok)))
    }
}

/// In-memory store whose appends wait while the gate is held
#[derive(Default)]
pub struct GatedStore {
    inner: MemoryStore,
    gate: tokio::sync::Mutex<()>,
}

impl GatedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Appends block until the returned guard is dropped
    pub async fn hold(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl EventStore for GatedStore {
    async fn append(&self, event: &DrillingEvent) -> Result<(), StoreError> {
        let _open = self.gate.lock().await;
        self.inner.append(event).await
    }

    async fn recent(&self, limit: u32) -> Result<Vec<DrillingEvent>, StoreError> {
        self.inner.recent(limit).await
    }

    fn all(&self) -> EventStream {
        self.inner.all()
    }
}

/// SQLite store in a fresh temporary directory
pub async fn sqlite_store() -> (tempfile::TempDir, Arc<SqliteEventStore>) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("drilling_data.db"))
        .await
        .unwrap();
    (dir, Arc::new(SqliteEventStore::new(pool)))
}
