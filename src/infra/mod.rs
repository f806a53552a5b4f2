//! Infrastructure layer for the energy ledger
//!
//! Contains:
//! - Error taxonomy and the `LogStore` storage trait
//! - Storage backends (in-memory, SQLite)
//! - The flush gate serializing batch assembly against ingestion
//! - Engine services: ingestion, batch assembly, inclusion proofs

mod batching;
mod error;
mod gate;
mod ingest;
mod memory;
mod proofs;
pub mod sqlite;
mod traits;

pub use batching::BatchAssembler;
pub use error::*;
pub use gate::FlushGate;
pub use ingest::LogIngestor;
pub use memory::InMemoryLogStore;
pub use proofs::ProofService;
pub use sqlite::SqliteLogStore;
pub use traits::*;
