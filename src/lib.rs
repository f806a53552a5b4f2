//! kwh-ledger library
//!
//! Tamper-evident ledger for metered energy intervals: logs are hashed into
//! Merkle leaves at ingestion, folded into batches under a single root, and
//! each log can later be proven a member of its batch.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (logs, batches, proofs)
//! - [`crypto`] - Leaf hashing and the Merkle engine
//! - [`infra`] - Storage, flush serialization and engine services
//! - [`anchor`] - Anchor lifecycle and simulator
//! - [`api`] - REST API routes

pub mod anchor;
pub mod api;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod migrations;
pub mod server;

// Re-export commonly used types
pub use domain::{
    AnchorConfirmation, AnchorStatus, BatchId, EnergyBatch, EnergyLog, EnergyLogIn, Hash256,
    LogId, Position, ProofDocument, ProofResult, ProofStep,
};

pub use infra::{
    BatchAssembler, InMemoryLogStore, LedgerError, LogIngestor, LogStore, ProofService, Result,
    SqliteLogStore,
};
