//! Domain models for the kWh ledger
//!
//! Typed entities for energy logs, Merkle batches, anchor metadata and
//! inclusion proofs. Everything here is already-valid data: validation
//! happens once at the ingestion boundary.

mod batch;
mod energy_log;
mod proof;
mod types;

pub use batch::*;
pub use energy_log::*;
pub use proof::*;
pub use types::*;

#[cfg(test)]
pub(crate) use energy_log::fixtures;
