//! Trait definitions for ledger storage

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{AnchorConfirmation, BatchId, EnergyBatch, EnergyLog, LogId};

use super::Result;

/// Storage collaborator consumed by the engine.
///
/// Invariants every implementation upholds:
/// - `list_unbatched_logs` returns logs in ingestion order
/// - `get_logs_by_batch` returns logs in the batch's commitment order
/// - a log's `batch_id` is written at most once
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Persist a freshly ingested log
    async fn save_log(&self, log: &EnergyLog) -> Result<()>;

    /// Read a log by id
    async fn get_log(&self, id: &LogId) -> Result<Option<EnergyLog>>;

    /// All logs in ingestion order
    async fn list_logs(&self) -> Result<Vec<EnergyLog>>;

    /// Logs without a batch, in ingestion order
    async fn list_unbatched_logs(&self) -> Result<Vec<EnergyLog>>;

    /// Members of a batch in commitment order
    async fn get_logs_by_batch(&self, batch_id: &BatchId) -> Result<Vec<EnergyLog>>;

    /// Persist `batch` and stamp every log in `batch.log_ids` with its id.
    ///
    /// Both happen as one unit: on any failure (duplicate batch id, missing
    /// or already-batched log) storage is left unchanged.
    async fn commit_batch(&self, batch: &EnergyBatch) -> Result<()>;

    /// Read a batch by id
    async fn get_batch(&self, id: &BatchId) -> Result<Option<EnergyBatch>>;

    /// All batches in creation order
    async fn list_batches(&self) -> Result<Vec<EnergyBatch>>;

    /// Write anchor fields and mark the batch anchored.
    ///
    /// With `only_if_pending` the write is skipped when the batch is already
    /// anchored. Returns whether a row was written.
    async fn update_anchor(
        &self,
        batch_id: &BatchId,
        confirmation: &AnchorConfirmation,
        only_if_pending: bool,
    ) -> Result<bool>;

    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> Result<()>;
}
