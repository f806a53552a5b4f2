//! Proof verification handler.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::api::types::VerifyProofResponse;
use crate::api::ApiError;
use crate::crypto::verify_document;
use crate::domain::ProofDocument;

/// POST /api/v1/proofs/verify - Check an interchange proof document.
///
/// Stateless: nothing is looked up, the document alone decides.
pub async fn verify_proof(
    document: Result<Json<ProofDocument>, JsonRejection>,
) -> Result<Json<VerifyProofResponse>, ApiError> {
    let Json(document) = document?;
    let valid = verify_document(&document)?;
    Ok(Json(VerifyProofResponse {
        valid,
        log_id: document.log_id,
        batch_id: document.batch_id,
    }))
}
