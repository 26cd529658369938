//! rigstream-ingest library
//!
//! Drilling telemetry ingestion: samples are analyzed, persisted, classified
//! and pushed to live subscribers; history and CSV export are served from
//! the same store.

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod analyzer;
pub mod api;
pub mod config;
pub mod pipeline;
pub mod query;
pub mod registry;
pub mod store;

use analyzer::Analyzer;
use config::IngestSettings;
use pipeline::IngestionPipeline;
use query::QueryService;
use registry::SubscriberRegistry;
use store::EventStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub query: QueryService,
    pub registry: Arc<SubscriberRegistry>,
}

impl AppState {
    /// Wire analyzer, store and a fresh subscriber registry together
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        store: Arc<dyn EventStore>,
        settings: &IngestSettings,
    ) -> Self {
        let registry = SubscriberRegistry::new(settings.subscriber_buffer);
        let pipeline = Arc::new(IngestionPipeline::new(
            analyzer,
            Arc::clone(&store),
            Arc::clone(&registry),
            settings.analyzer_timeout(),
        ));
        let query = QueryService::new(
            store,
            settings.history_default_limit,
            settings.history_max_limit,
        );

        Self {
            pipeline,
            query,
            registry,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/ingest", post(api::ingest_sample))
        .route("/history", get(api::get_history))
        .route("/export", get(api::export_csv))
        .route("/events", get(api::event_stream))
        .route("/build_info", get(api::get_build_info))
        .merge(api::health_routes())
        .with_state(state)
        // Dashboards are served from a different origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
