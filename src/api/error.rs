//! Structured API error responses with error codes
//!
//! Every failure leaves the API as `{ "error": { code, numeric_code, message, ... } }`
//! with the code repeated in the `x-error-code` header.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::crypto::MerkleError;
use crate::infra::LedgerError;

// ============================================================================
// Error Codes
// ============================================================================

/// Error codes for API responses
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (3xxx)
    /// Request body is malformed
    InvalidRequestBody,
    /// Field value is invalid
    InvalidFieldValue,
    /// Proof step has an unknown position or malformed hash
    InvalidProofStep,
    /// Hash field is not 64 lowercase hex characters
    InvalidHash,

    // Resource errors (4xxx)
    /// Log not found
    LogNotFound,
    /// Batch not found
    BatchNotFound,

    // Ledger state errors (7xxx)
    /// Flush requested with nothing pending
    NoUnbatchedLogs,
    /// Proof requested for a log that is not in a batch yet
    NotBatched,
    /// Batch already carries a different anchor
    AlreadyAnchored,

    // Infrastructure errors (8xxx)
    /// Database operation failed
    DatabaseError,
    /// Stored data diverges from its commitment
    IntegrityFault,
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn numeric_code(&self) -> u32 {
        match self {
            // Validation (3xxx)
            ErrorCode::InvalidRequestBody => 3001,
            ErrorCode::InvalidFieldValue => 3003,
            ErrorCode::InvalidProofStep => 3101,
            ErrorCode::InvalidHash => 3102,

            // Resource (4xxx)
            ErrorCode::LogNotFound => 4001,
            ErrorCode::BatchNotFound => 4003,

            // Ledger state (7xxx)
            ErrorCode::NoUnbatchedLogs => 7001,
            ErrorCode::NotBatched => 7002,
            ErrorCode::AlreadyAnchored => 7003,

            // Infrastructure (8xxx)
            ErrorCode::DatabaseError => 8001,
            ErrorCode::IntegrityFault => 8002,
            ErrorCode::InternalError => 8999,
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequestBody
            | ErrorCode::InvalidFieldValue
            | ErrorCode::InvalidProofStep
            | ErrorCode::InvalidHash
            | ErrorCode::NoUnbatchedLogs => StatusCode::BAD_REQUEST,

            ErrorCode::LogNotFound | ErrorCode::BatchNotFound => StatusCode::NOT_FOUND,

            ErrorCode::NotBatched | ErrorCode::AlreadyAnchored => StatusCode::CONFLICT,

            ErrorCode::DatabaseError | ErrorCode::IntegrityFault | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::InvalidProofStep => "INVALID_PROOF_STEP",
            ErrorCode::InvalidHash => "INVALID_HASH",
            ErrorCode::LogNotFound => "LOG_NOT_FOUND",
            ErrorCode::BatchNotFound => "BATCH_NOT_FOUND",
            ErrorCode::NoUnbatchedLogs => "NO_UNBATCHED_LOGS",
            ErrorCode::NotBatched => "NOT_BATCHED",
            ErrorCode::AlreadyAnchored => "ALREADY_ANCHORED",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::IntegrityFault => "INTEGRITY_FAULT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Structured Error Response
// ============================================================================

/// Structured error response for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code for easy categorization
    pub numeric_code: u32,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Related resource ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
                resource_id: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.error.code.as_str();
        let mut response = (status, Json(self)).into_response();

        response.headers_mut().insert(
            axum::http::header::HeaderName::from_static("x-error-code"),
            axum::http::HeaderValue::from_static(code),
        );

        response
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<MerkleError> for ApiError {
    fn from(err: MerkleError) -> Self {
        match &err {
            MerkleError::InvalidProofStep { step, .. } => {
                ApiError::new(ErrorCode::InvalidProofStep, err.to_string())
                    .with_details(serde_json::json!({ "step": step }))
            }
            MerkleError::InvalidHash { field } => {
                ApiError::new(ErrorCode::InvalidHash, err.to_string())
                    .with_details(serde_json::json!({ "field": field }))
            }
            MerkleError::IndexOutOfRange { .. } => {
                ApiError::new(ErrorCode::InternalError, err.to_string())
            }
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        if err.is_integrity_fault() {
            tracing::error!(error = %err, "Integrity fault surfaced to client");
        }

        match err {
            LedgerError::Database(e) => {
                ApiError::new(ErrorCode::DatabaseError, format!("Database error: {e}"))
            }
            LedgerError::NoUnbatchedLogs => {
                ApiError::new(ErrorCode::NoUnbatchedLogs, "No unbatched logs available")
            }
            LedgerError::LogNotFound(id) => {
                ApiError::new(ErrorCode::LogNotFound, format!("Log not found: {id}"))
                    .with_resource_id(id.0)
            }
            LedgerError::BatchNotFound(id) => {
                ApiError::new(ErrorCode::BatchNotFound, format!("Batch not found: {id}"))
                    .with_resource_id(id.0)
            }
            LedgerError::NotBatched(id) => {
                ApiError::new(ErrorCode::NotBatched, format!("Log {id} has not been batched yet"))
                    .with_resource_id(id.0)
            }
            LedgerError::Merkle(e) => e.into(),
            LedgerError::RootMismatch {
                batch_id,
                stored,
                computed,
            } => ApiError::new(
                ErrorCode::IntegrityFault,
                format!("Merkle root mismatch for batch {batch_id}"),
            )
            .with_details(serde_json::json!({
                "stored_root": stored,
                "recomputed_root": computed,
            }))
            .with_resource_id(batch_id.0),
            LedgerError::Validation(v) => ApiError::new(ErrorCode::InvalidFieldValue, v.to_string())
                .with_details(serde_json::json!({ "field": v.field })),
            LedgerError::DuplicateBatch(id) => ApiError::new(
                ErrorCode::IntegrityFault,
                format!("Batch id collision: {id}"),
            )
            .with_resource_id(id.0),
            LedgerError::AlreadyAnchored(id) => ApiError::new(
                ErrorCode::AlreadyAnchored,
                format!("Batch {id} is already anchored"),
            )
            .with_resource_id(id.0),
            LedgerError::InvariantViolation { invariant, message } => ApiError::new(
                ErrorCode::IntegrityFault,
                format!("Invariant violation: {invariant} - {message}"),
            )
            .with_details(serde_json::json!({ "invariant": invariant })),
            LedgerError::Serialization(e) => {
                ApiError::new(ErrorCode::InternalError, format!("Serialization error: {e}"))
            }
            LedgerError::Configuration(msg) => {
                ApiError::new(ErrorCode::InternalError, format!("Configuration error: {msg}"))
            }
            LedgerError::Internal(msg) => ApiError::new(ErrorCode::InternalError, msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(ErrorCode::InvalidRequestBody, rejection.body_text())
    }
}

// ============================================================================
// Tests
// ============================================================================
