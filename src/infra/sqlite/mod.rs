//! SQLite implementation of the ledger store
//!
//! Logs, batches and batch membership live in three tables; see
//! `migrations/sqlite` for the schema.

mod store;

pub use store::*;
