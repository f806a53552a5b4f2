//! Anchor handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use tracing::instrument;

use crate::api::ApiError;
use crate::domain::{AnchorConfirmation, BatchId, EnergyBatch};
use crate::server::AppState;

/// POST /api/v1/batches/:batch_id/anchor - Record an external anchor confirmation.
#[instrument(skip(state, confirmation))]
pub async fn confirm_anchor(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    confirmation: Result<Json<AnchorConfirmation>, JsonRejection>,
) -> Result<Json<EnergyBatch>, ApiError> {
    let Json(confirmation) = confirmation?;
    let batch = state
        .anchors
        .confirm(&BatchId(batch_id), confirmation)
        .await?;
    Ok(Json(batch))
}

/// POST /api/v1/batches/:batch_id/anchor/simulate - Anchor with a simulated confirmation.
#[instrument(skip(state))]
pub async fn simulate_anchor(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<EnergyBatch>, ApiError> {
    Ok(Json(state.simulator.simulate(&BatchId(batch_id)).await?))
}
