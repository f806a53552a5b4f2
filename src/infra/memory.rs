//! In-memory storage for local runs and tests

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{AnchorConfirmation, BatchId, EnergyBatch, EnergyLog, LogId};
use crate::infra::{LedgerError, LogStore, Result};

#[derive(Default)]
struct Inner {
    /// Ingestion order
    logs: Vec<EnergyLog>,
    log_index: HashMap<LogId, usize>,
    /// Creation order
    batches: Vec<EnergyBatch>,
    batch_index: HashMap<BatchId, usize>,
}

/// Process-local [`LogStore`] backed by ordered vectors.
#[derive(Default)]
pub struct InMemoryLogStore {
    inner: RwLock<Inner>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn save_log(&self, log: &EnergyLog) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.log_index.contains_key(&log.id) {
            return Err(LedgerError::invariant(
                "unique_log_id",
                format!("log {} already exists", log.id),
            ));
        }
        let pos = inner.logs.len();
        inner.log_index.insert(log.id.clone(), pos);
        inner.logs.push(log.clone());
        Ok(())
    }

    async fn get_log(&self, id: &LogId) -> Result<Option<EnergyLog>> {
        let inner = self.inner.read().await;
        Ok(inner.log_index.get(id).map(|&i| inner.logs[i].clone()))
    }

    async fn list_logs(&self) -> Result<Vec<EnergyLog>> {
        Ok(self.inner.read().await.logs.clone())
    }

    async fn list_unbatched_logs(&self) -> Result<Vec<EnergyLog>> {
        let inner = self.inner.read().await;
        Ok(inner
            .logs
            .iter()
            .filter(|log| !log.is_batched())
            .cloned()
            .collect())
    }

    async fn get_logs_by_batch(&self, batch_id: &BatchId) -> Result<Vec<EnergyLog>> {
        let inner = self.inner.read().await;
        let Some(&b) = inner.batch_index.get(batch_id) else {
            return Ok(Vec::new());
        };
        Ok(inner.batches[b]
            .log_ids
            .iter()
            .filter_map(|id| inner.log_index.get(id).map(|&i| inner.logs[i].clone()))
            .collect())
    }

    async fn commit_batch(&self, batch: &EnergyBatch) -> Result<()> {
        let mut inner = self.inner.write().await;

        if inner.batch_index.contains_key(&batch.id) {
            return Err(LedgerError::DuplicateBatch(batch.id.clone()));
        }

        // Validate everything before mutating anything.
        let mut positions = Vec::with_capacity(batch.log_ids.len());
        for id in &batch.log_ids {
            let &i = inner.log_index.get(id).ok_or_else(|| {
                LedgerError::invariant("batch_member_exists", format!("log {id} does not exist"))
            })?;
            if let Some(existing) = &inner.logs[i].batch_id {
                return Err(LedgerError::invariant(
                    "single_batch_membership",
                    format!("log {id} already belongs to batch {existing}"),
                ));
            }
            positions.push(i);
        }

        for i in positions {
            inner.logs[i].batch_id = Some(batch.id.clone());
        }
        let pos = inner.batches.len();
        inner.batch_index.insert(batch.id.clone(), pos);
        inner.batches.push(batch.clone());
        Ok(())
    }

    async fn get_batch(&self, id: &BatchId) -> Result<Option<EnergyBatch>> {
        let inner = self.inner.read().await;
        Ok(inner.batch_index.get(id).map(|&i| inner.batches[i].clone()))
    }

    async fn list_batches(&self) -> Result<Vec<EnergyBatch>> {
        Ok(self.inner.read().await.batches.clone())
    }

    async fn update_anchor(
        &self,
        batch_id: &BatchId,
        confirmation: &AnchorConfirmation,
        only_if_pending: bool,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let &i = inner
            .batch_index
            .get(batch_id)
            .ok_or_else(|| LedgerError::BatchNotFound(batch_id.clone()))?;

        let batch = &mut inner.batches[i];
        if only_if_pending && batch.is_anchored() {
            return Ok(false);
        }
        batch.apply_anchor(confirmation.clone());
        Ok(true)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
