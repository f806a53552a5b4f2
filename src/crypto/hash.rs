//! Deterministic leaf hashing with domain separation
//!
//! Every implementation that wants to reproduce a leaf hash must produce the
//! same canonical bytes for a log payload:
//! - RFC 8785 JSON Canonicalization Scheme (JCS) via `serde_json_canonicalizer`
//! - Keys sorted lexicographically, no insignificant whitespace, UTF-8
//! - Numbers rendered with the ECMAScript rule (`1.0` -> `1`, `-0` -> `0`,
//!   shortest round-trip form for other floats)
//! - Integers are exact only up to 2^53 - 1; validation rejects larger values
//!
//! `leaf_hash = SHA256(b"LOG::" || JCS(payload))`

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::{EnergyLogIn, Hash256};

/// Domain prefix for energy log leaves.
///
/// Reserved so other leaf types can share the hash space later; never drop it.
pub const DOMAIN_LOG_LEAF: &[u8] = b"LOG::";

/// Convert a JSON value to its canonical string representation per RFC 8785.
///
/// Fails only for values JCS cannot represent (NaN or Infinity).
pub fn canonicalize_json(value: &serde_json::Value) -> Result<String, serde_json::Error> {
    serde_json_canonicalizer::to_string(value)
}

/// Canonical bytes of any serializable payload.
pub fn canonical_bytes<T: Serialize>(payload: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = serde_json::to_value(payload)?;
    Ok(canonicalize_json(&value)?.into_bytes())
}

/// Hash already-canonical payload bytes into a log leaf.
pub fn leaf_hash_from_payload(canonical: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_LOG_LEAF);
    hasher.update(canonical);
    hasher.finalize().into()
}

/// Compute the leaf hash of a validated energy log.
pub fn compute_log_leaf_hash(log: &EnergyLogIn) -> Result<Hash256, serde_json::Error> {
    let canonical = canonical_bytes(log)?;
    Ok(leaf_hash_from_payload(&canonical))
}

/// Hash raw bytes with SHA-256 (no domain prefix)
pub fn sha256(data: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Combine two nodes over their raw bytes: `SHA256(left || right)`
pub fn hash_pair(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}
