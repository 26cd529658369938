//! Sample ingestion endpoint

use crate::pipeline::{IngestAck, IngestError};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use rigstream_common::RawSample;
use serde::Deserialize;

/// Request body for `POST /ingest`
///
/// Every field is optional at the parsing stage so a missing field becomes
/// an `InvalidInput` naming it rather than a generic JSON rejection.
#[derive(Debug, Default, Deserialize)]
pub struct IngestRequest {
    pub bit_depth: Option<f64>,
    #[serde(rename = "wobs")]
    pub wob: Option<f64>,
    pub rpm: Option<f64>,
    pub torque: Option<f64>,
    pub flow_rate: Option<f64>,
    pub mud_density: Option<f64>,
    pub annular_pressure: Option<f64>,
}

fn required(value: Option<f64>, name: &str) -> Result<f64, IngestError> {
    value.ok_or_else(|| IngestError::InvalidInput(format!("missing field `{name}`")))
}

impl TryFrom<IngestRequest> for RawSample {
    type Error = IngestError;

    fn try_from(req: IngestRequest) -> Result<Self, Self::Error> {
        Ok(RawSample {
            bit_depth: required(req.bit_depth, "bit_depth")?,
            wob: required(req.wob, "wobs")?,
            rpm: required(req.rpm, "rpm")?,
            torque: required(req.torque, "torque")?,
            flow_rate: required(req.flow_rate, "flow_rate")?,
            mud_density: required(req.mud_density, "mud_density")?,
            annular_pressure: required(req.annular_pressure, "annular_pressure")?,
        })
    }
}

/// POST /ingest
///
/// Runs one sample through the pipeline and returns the acknowledgment.
pub async fn ingest_sample(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestAck>, IngestError> {
    let Json(request) = payload.map_err(|e| IngestError::InvalidInput(e.body_text()))?;
    let raw = RawSample::try_from(request)?;

    let ack = state.pipeline.ingest(raw).await?;
    Ok(Json(ack))
}
