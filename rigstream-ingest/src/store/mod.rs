//! Event Store: append-only durable log of enriched samples
//!
//! `append` is the only mutator. Reads return events newest first, ordered
//! by timestamp with insertion order breaking ties.

use async_trait::async_trait;
use futures::stream::BoxStream;
use rigstream_common::DrillingEvent;
use thiserror::Error;

mod sqlite;

pub use sqlite::SqliteEventStore;

/// Lazily produced sequence of stored events, newest first
pub type EventStream = BoxStream<'static, Result<DrillingEvent, StoreError>>;

/// Event store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The event could not be durably written
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Stored events could not be read
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// A stored row could not be decoded
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Durable, append-only storage of drilling events
///
/// Implementations serialize concurrent appends internally. Once `append`
/// returns `Ok`, the event is visible to every later read.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: &DrillingEvent) -> Result<(), StoreError>;

    /// Up to `limit` most recent events, newest first (empty on an empty store)
    async fn recent(&self, limit: u32) -> Result<Vec<DrillingEvent>, StoreError>;

    /// Every stored event, newest first, streamed rather than buffered
    fn all(&self) -> EventStream;
}
