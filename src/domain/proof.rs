//! Merkle inclusion proof types and the proof interchange format

use serde::{Deserialize, Serialize};

use super::{hash256_hex, BatchId, Hash256, LogId};

/// Side on which a proof step's sibling sits relative to the running hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// `parent = H(sibling || current)`
    Left,
    /// `parent = H(current || sibling)`
    Right,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Left => "left",
            Position::Right => "right",
        }
    }
}

/// One level of an inclusion proof, bottom-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub position: Position,
    #[serde(with = "hash256_hex")]
    pub hash: Hash256,
}

impl ProofStep {
    pub fn new(position: Position, hash: Hash256) -> Self {
        Self { position, hash }
    }
}

/// Proof step as received from untrusted input, before parsing.
///
/// Positions other than `left`/`right` and malformed hashes are rejected
/// during verification rather than at deserialization, so that a tampered
/// document yields a precise error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProofStep {
    pub position: String,
    pub hash: String,
}

impl From<ProofStep> for RawProofStep {
    fn from(step: ProofStep) -> Self {
        Self {
            position: step.position.as_str().to_string(),
            hash: hex::encode(step.hash),
        }
    }
}

/// Inclusion proof for one log, in the interchange format:
///
/// ```json
/// { "log_id": "...", "batch_id": "...", "leaf_hash": "<hex64>",
///   "merkle_root": "<hex64>", "index": 1,
///   "proof": [ { "position": "left", "hash": "<hex64>" } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofResult {
    pub log_id: LogId,
    pub batch_id: BatchId,
    #[serde(with = "hash256_hex")]
    pub leaf_hash: Hash256,
    #[serde(with = "hash256_hex")]
    pub merkle_root: Hash256,
    pub index: usize,
    pub proof: Vec<ProofStep>,
}

/// Interchange document as accepted by standalone verifiers.
///
/// Only `leaf_hash`, `merkle_root` and `proof` take part in verification; the
/// identifying fields are carried through for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofDocument {
    #[serde(default)]
    pub log_id: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
    pub leaf_hash: String,
    pub merkle_root: String,
    #[serde(default)]
    pub index: Option<usize>,
    pub proof: Vec<RawProofStep>,
}

impl From<ProofResult> for ProofDocument {
    fn from(result: ProofResult) -> Self {
        Self {
            log_id: Some(result.log_id.0),
            batch_id: Some(result.batch_id.0),
            leaf_hash: hex::encode(result.leaf_hash),
            merkle_root: hex::encode(result.merkle_root),
            index: Some(result.index),
            proof: result.proof.into_iter().map(RawProofStep::from).collect(),
        }
    }
}
