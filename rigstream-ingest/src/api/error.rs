//! HTTP mapping of pipeline and store errors
//!
//! Error bodies are `{"error": <message>, "kind": <machine-readable kind>}`.

use crate::pipeline::IngestError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

impl IngestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            IngestError::AnalysisFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            IngestError::PersistFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (self.status_code(), body).into_response()
    }
}

impl StoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::WriteFailed(_) => "write_failed",
            StoreError::ReadFailed(_) => "read_failed",
            StoreError::Corrupt(_) => "corrupt",
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": format!("Database error: {}", self),
            "kind": self.kind(),
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
