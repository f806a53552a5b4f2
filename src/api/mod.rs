//! API layer for the energy ledger
//!
//! REST endpoints for ingestion, batching, anchoring and inclusion proofs.

pub mod error;
mod handlers;
mod rest;
pub mod types;

pub use error::{ApiError, ErrorCode};
pub use rest::*;
