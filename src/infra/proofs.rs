//! Inclusion proofs for committed logs

use std::sync::Arc;

use tracing::instrument;

use crate::crypto::{build_proof, build_root, verify};
use crate::domain::{BatchId, EnergyBatch, Hash256, LogId, ProofResult};
use crate::infra::{LedgerError, LogStore, Result};

/// Rebuilds the Merkle tree of a log's batch from storage and extracts the
/// log's audit path.
///
/// Every proof request re-derives the batch root from the stored leaves and
/// compares it with the committed root. A disagreement is reported as
/// [`LedgerError::RootMismatch`] and is never repaired here.
#[derive(Clone)]
pub struct ProofService {
    store: Arc<dyn LogStore>,
}

impl ProofService {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(log_id = %log_id))]
    pub async fn get_proof(&self, log_id: &LogId) -> Result<ProofResult> {
        let log = self
            .store
            .get_log(log_id)
            .await?
            .ok_or_else(|| LedgerError::LogNotFound(log_id.clone()))?;

        let batch_id = log
            .batch_id
            .clone()
            .ok_or_else(|| LedgerError::NotBatched(log_id.clone()))?;

        let batch = self
            .store
            .get_batch(&batch_id)
            .await?
            .ok_or_else(|| LedgerError::BatchNotFound(batch_id.clone()))?;

        let leaves = self.committed_leaves(&batch).await?;

        let index = batch
            .log_ids
            .iter()
            .position(|id| id == log_id)
            .ok_or_else(|| {
                LedgerError::invariant(
                    "batch_membership",
                    format!("log {log_id} is stamped with {batch_id} but is not a member"),
                )
            })?;

        let proof = build_proof(&leaves, index)?;
        if !verify(&log.leaf_hash, &batch.merkle_root, &proof) {
            return Err(root_mismatch(&batch, &leaves));
        }

        Ok(ProofResult {
            log_id: log.id,
            batch_id,
            leaf_hash: log.leaf_hash,
            merkle_root: batch.merkle_root,
            index,
            proof,
        })
    }

    /// Recompute a batch's root from storage without building any proof.
    #[instrument(skip(self))]
    pub async fn audit_batch(&self, batch_id: &BatchId) -> Result<EnergyBatch> {
        let batch = self
            .store
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| LedgerError::BatchNotFound(batch_id.clone()))?;
        self.committed_leaves(&batch).await?;
        Ok(batch)
    }

    /// Load the batch's leaves in commitment order and check them against
    /// the stored root.
    async fn committed_leaves(&self, batch: &EnergyBatch) -> Result<Vec<Hash256>> {
        let members = self.store.get_logs_by_batch(&batch.id).await?;

        let member_ids: Vec<&LogId> = members.iter().map(|log| &log.id).collect();
        let declared: Vec<&LogId> = batch.log_ids.iter().collect();
        if member_ids != declared || batch.log_count as usize != members.len() {
            return Err(LedgerError::invariant(
                "batch_membership",
                format!(
                    "batch {} declares {} logs but storage returned {}",
                    batch.id,
                    batch.log_count,
                    members.len()
                ),
            ));
        }

        let leaves: Vec<Hash256> = members.iter().map(|log| log.leaf_hash).collect();
        if build_root(&leaves) != batch.merkle_root {
            return Err(root_mismatch(batch, &leaves));
        }
        Ok(leaves)
    }
}

fn root_mismatch(batch: &EnergyBatch, leaves: &[Hash256]) -> LedgerError {
    let stored = hex::encode(batch.merkle_root);
    let computed = hex::encode(build_root(leaves));
    tracing::error!(
        batch_id = %batch.id,
        stored_root = %stored,
        recomputed_root = %computed,
        "Merkle root mismatch: stored data diverges from its commitment"
    );
    LedgerError::RootMismatch {
        batch_id: batch.id.clone(),
        stored,
        computed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::compute_log_leaf_hash;
    use crate::domain::fixtures::sample_log_in;
    use crate::domain::EnergyLog;
    use crate::infra::MockLogStore;
    use chrono::Utc;

    fn batched(logs: &mut [EnergyLog], root: Option<Hash256>) -> EnergyBatch {
        let leaves: Vec<Hash256> = logs.iter().map(|l| l.leaf_hash).collect();
        let batch = EnergyBatch::new(
            BatchId::from("batch_test"),
            Utc::now(),
            logs.iter().map(|l| l.id.clone()).collect(),
            root.unwrap_or_else(|| build_root(&leaves)),
        );
        for log in logs.iter_mut() {
            log.batch_id = Some(batch.id.clone());
        }
        batch
    }

    fn logs(n: usize) -> Vec<EnergyLog> {
        (0..n)
            .map(|i| {
                let payload = sample_log_in(&format!("m-{i}"), i as f64 + 0.5);
                EnergyLog {
                    id: LogId::generate(),
                    leaf_hash: compute_log_leaf_hash(&payload).unwrap(),
                    payload,
                    batch_id: None,
                }
            })
            .collect()
    }

    fn mock(logs: Vec<EnergyLog>, batch: Option<EnergyBatch>) -> MockLogStore {
        let mut store = MockLogStore::new();
        let by_id = logs.clone();
        store
            .expect_get_log()
            .returning(move |id| Ok(by_id.iter().find(|l| &l.id == id).cloned()));
        let b = batch.clone();
        store.expect_get_batch().returning(move |_| Ok(b.clone()));
        store
            .expect_get_logs_by_batch()
            .returning(move |_| Ok(logs.clone()));
        store
    }

    #[tokio::test]
    async fn test_proof_for_middle_of_three() {
        let mut logs = logs(3);
        let batch = batched(&mut logs, None);
        let target = logs[1].clone();
        let service = ProofService::new(Arc::new(mock(logs, Some(batch.clone()))));

        let result = service.get_proof(&target.id).await.unwrap();
        assert_eq!(result.index, 1);
        assert_eq!(result.proof.len(), 2);
        assert_eq!(result.merkle_root, batch.merkle_root);
        assert!(verify(&target.leaf_hash, &batch.merkle_root, &result.proof));
    }

    #[tokio::test]
    async fn test_unbatched_log() {
        let logs = logs(1);
        let target = logs[0].id.clone();
        let service = ProofService::new(Arc::new(mock(logs, None)));

        let err = service.get_proof(&target).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotBatched(_)));
    }

    #[tokio::test]
    async fn test_missing_batch_is_not_found() {
        let mut logs = logs(2);
        batched(&mut logs, None);
        let target = logs[0].id.clone();
        let service = ProofService::new(Arc::new(mock(logs, None)));

        let err = service.get_proof(&target).await.unwrap_err();
        assert!(matches!(err, LedgerError::BatchNotFound(_)));
    }

    #[tokio::test]
    async fn test_tampered_root_is_surfaced() {
        let mut logs = logs(4);
        let batch = batched(&mut logs, Some([0xAB; 32]));
        let target = logs[2].id.clone();
        let service = ProofService::new(Arc::new(mock(logs, Some(batch.clone()))));

        let err = service.get_proof(&target).await.unwrap_err();
        assert!(err.is_integrity_fault());
        assert!(matches!(err, LedgerError::RootMismatch { .. }));

        let err = service.audit_batch(&batch.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::RootMismatch { .. }));
    }

    #[tokio::test]
    async fn test_unknown_log() {
        let service = ProofService::new(Arc::new(mock(vec![], None)));
        let err = service.get_proof(&LogId::from("log_x")).await.unwrap_err();
        assert!(matches!(err, LedgerError::LogNotFound(_)));
    }
}
