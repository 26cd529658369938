//! HTTP API handlers for rigstream-ingest

pub mod buildinfo;
pub mod error;
pub mod health;
pub mod history;
pub mod ingest;
pub mod sse;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use history::{export_csv, get_history};
pub use ingest::ingest_sample;
pub use sse::event_stream;
