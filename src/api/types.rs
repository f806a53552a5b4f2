//! Request and response bodies that are not domain entities themselves.

use serde::{Deserialize, Serialize};

/// Response for `POST /v1/proofs/verify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyProofResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}
