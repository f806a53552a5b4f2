//! Batch handlers.

use axum::extract::{Path, State};
use axum::Json;
use tracing::instrument;

use crate::api::ApiError;
use crate::domain::{BatchId, EnergyBatch};
use crate::server::AppState;

/// POST /api/v1/batches/flush - Commit every unbatched log into a new batch.
#[instrument(skip(state))]
pub async fn flush_batch(State(state): State<AppState>) -> Result<Json<EnergyBatch>, ApiError> {
    Ok(Json(state.assembler.flush().await?))
}

/// GET /api/v1/batches - List batches in creation order.
pub async fn list_batches(
    State(state): State<AppState>,
) -> Result<Json<Vec<EnergyBatch>>, ApiError> {
    Ok(Json(state.assembler.list_batches().await?))
}

/// GET /api/v1/batches/:batch_id
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<EnergyBatch>, ApiError> {
    Ok(Json(state.assembler.get_batch(&BatchId(batch_id)).await?))
}

/// GET /api/v1/batches/:batch_id/audit - Recompute the batch root from its
/// stored leaves. A divergence is reported as an integrity fault.
#[instrument(skip(state))]
pub async fn audit_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<EnergyBatch>, ApiError> {
    Ok(Json(state.proofs.audit_batch(&BatchId(batch_id)).await?))
}
