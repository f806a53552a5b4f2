//! Error types for the ledger engine and its storage

use thiserror::Error;

use crate::crypto::MerkleError;
use crate::domain::{BatchId, LogId, ValidationError};

/// Errors that can occur in the ledger engine
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Flush attempted with nothing pending
    #[error("no unbatched logs available")]
    NoUnbatchedLogs,

    /// Log not found
    #[error("log not found: {0}")]
    LogNotFound(LogId),

    /// Batch not found
    #[error("batch not found: {0}")]
    BatchNotFound(BatchId),

    /// Proof requested before the log was committed in a batch
    #[error("log {0} has not been batched yet")]
    NotBatched(LogId),

    /// Proof construction or verification error
    #[error(transparent)]
    Merkle(#[from] MerkleError),

    /// Stored root disagrees with the root recomputed from stored leaves
    #[error("merkle root mismatch for batch {batch_id}: stored {stored}, recomputed {computed}")]
    RootMismatch {
        batch_id: BatchId,
        stored: String,
        computed: String,
    },

    /// Incoming log failed boundary validation
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Batch id already taken
    #[error("duplicate batch id: {0}")]
    DuplicateBatch(BatchId),

    /// Anchor fields already written with different data
    #[error("batch {0} is already anchored")]
    AlreadyAnchored(BatchId),

    /// Storage-level invariant violation
    #[error("invariant violation: {invariant} - {message}")]
    InvariantViolation { invariant: String, message: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub(crate) fn invariant(invariant: &str, message: impl Into<String>) -> Self {
        LedgerError::InvariantViolation {
            invariant: invariant.to_string(),
            message: message.into(),
        }
    }

    /// Server-side integrity faults that warrant alerting, as opposed to
    /// expected business outcomes reported back to the caller.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            LedgerError::RootMismatch { .. }
                | LedgerError::InvariantViolation { .. }
                | LedgerError::DuplicateBatch(_)
        )
    }
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
