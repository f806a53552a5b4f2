//! Log ingestion and lookup handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use tracing::instrument;

use crate::api::ApiError;
use crate::domain::{EnergyLog, EnergyLogIn, LogId, ProofResult};
use crate::server::AppState;

/// POST /api/v1/logs - Ingest a canonical energy log.
#[instrument(skip_all)]
pub async fn create_log(
    State(state): State<AppState>,
    payload: Result<Json<EnergyLogIn>, JsonRejection>,
) -> Result<Json<EnergyLog>, ApiError> {
    let Json(payload) = payload?;
    let log = state.ingestor.ingest(payload).await?;
    Ok(Json(log))
}

/// GET /api/v1/logs - List all logs in ingestion order.
pub async fn list_logs(State(state): State<AppState>) -> Result<Json<Vec<EnergyLog>>, ApiError> {
    Ok(Json(state.ingestor.list_logs().await?))
}

/// GET /api/v1/logs/:log_id
pub async fn get_log(
    State(state): State<AppState>,
    Path(log_id): Path<String>,
) -> Result<Json<EnergyLog>, ApiError> {
    Ok(Json(state.ingestor.get_log(&LogId(log_id)).await?))
}

/// GET /api/v1/logs/:log_id/proof - Inclusion proof in the interchange format.
#[instrument(skip(state))]
pub async fn get_log_proof(
    State(state): State<AppState>,
    Path(log_id): Path<String>,
) -> Result<Json<ProofResult>, ApiError> {
    Ok(Json(state.proofs.get_proof(&LogId(log_id)).await?))
}
