//! History and export endpoints

use crate::store::StoreError;
use crate::AppState;
use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use rigstream_common::DrillingEvent;
use serde::Deserialize;
use tracing::warn;

/// Query parameters for `GET /history`
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Number of events (default from config, clamped to the configured maximum)
    pub limit: Option<u32>,
}

/// GET /history
///
/// Most recent events, newest first.
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DrillingEvent>>, StoreError> {
    let events = state.query.history(query.limit).await?;
    Ok(Json(events))
}

/// GET /export
///
/// Streams the full history as CSV, newest first.
pub async fn export_csv(State(state): State<AppState>) -> Response {
    let rows = state
        .query
        .export_rows()
        .inspect_err(|e| warn!("CSV export aborted: {}", e));

    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=drilling_data.csv",
            ),
        ],
        Body::from_stream(rows),
    )
        .into_response()
}
