//! Cryptographic core of the ledger
//!
//! Provides:
//! - Canonical JSON serialization (RFC 8785, cross-language compatible)
//! - Domain-separated leaf hashing for energy logs
//! - Merkle root construction, inclusion proofs and proof verification

mod hash;
mod merkle;

pub use hash::*;
pub use merkle::*;
