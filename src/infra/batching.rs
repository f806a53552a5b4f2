//! Batch assembly: fold every unbatched log into one Merkle-committed batch

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::crypto::build_root;
use crate::domain::{BatchId, EnergyBatch, Hash256};
use crate::infra::{FlushGate, LedgerError, LogStore, Result};

/// Builds batches from pending logs.
///
/// Members are taken in ingestion order, which is also the order
/// `LogStore::get_logs_by_batch` reproduces for proofs.
#[derive(Clone)]
pub struct BatchAssembler {
    store: Arc<dyn LogStore>,
    gate: FlushGate,
}

impl BatchAssembler {
    pub fn new(store: Arc<dyn LogStore>, gate: FlushGate) -> Self {
        Self { store, gate }
    }

    /// Commit all unbatched logs into a new batch.
    pub async fn flush(&self) -> Result<EnergyBatch> {
        self.flush_at(Utc::now()).await
    }

    #[instrument(skip(self))]
    pub async fn flush_at(&self, now: DateTime<Utc>) -> Result<EnergyBatch> {
        let _guard = self.gate.flush().await;

        let pending = self.store.list_unbatched_logs().await?;
        if pending.is_empty() {
            return Err(LedgerError::NoUnbatchedLogs);
        }

        let leaves: Vec<Hash256> = pending.iter().map(|log| log.leaf_hash).collect();
        let merkle_root = build_root(&leaves);
        let log_ids = pending.into_iter().map(|log| log.id).collect();

        let batch = EnergyBatch::new(BatchId::generate(now), now, log_ids, merkle_root);
        self.store.commit_batch(&batch).await?;

        tracing::info!(
            batch_id = %batch.id,
            log_count = batch.log_count,
            merkle_root = %hex::encode(batch.merkle_root),
            "Committed batch"
        );
        Ok(batch)
    }

    pub async fn list_batches(&self) -> Result<Vec<EnergyBatch>> {
        self.store.list_batches().await
    }

    pub async fn get_batch(&self, id: &BatchId) -> Result<EnergyBatch> {
        self.store
            .get_batch(id)
            .await?
            .ok_or_else(|| LedgerError::BatchNotFound(id.clone()))
    }
}
