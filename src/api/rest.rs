//! REST API routes for the energy ledger.

use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers::*;
use crate::server::AppState;

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/logs", post(create_log).get(list_logs))
        .route("/v1/logs/:log_id", get(get_log))
        .route("/v1/logs/:log_id/proof", get(get_log_proof))
        .route("/v1/batches/flush", post(flush_batch))
        .route("/v1/batches", get(list_batches))
        .route("/v1/batches/:batch_id", get(get_batch))
        .route("/v1/batches/:batch_id/audit", get(audit_batch))
        .route("/v1/batches/:batch_id/anchor", post(confirm_anchor))
        .route(
            "/v1/batches/:batch_id/anchor/simulate",
            post(simulate_anchor),
        )
        .route("/v1/proofs/verify", post(verify_proof))
}
