//! # RigStream Common Library
//!
//! Shared code for the RigStream services including:
//! - Drilling telemetry model (samples, derived fields, events, priority)
//! - Configuration loading and root folder resolution
//! - Database initialization
//! - Timestamp encoding

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{Alert, DerivedFields, DrillingEvent, LiveEvent, Priority, RawSample};
