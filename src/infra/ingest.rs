//! Record ingestion

use std::sync::Arc;

use tracing::instrument;

use crate::crypto::compute_log_leaf_hash;
use crate::domain::{EnergyLog, EnergyLogIn, LogId};
use crate::infra::{FlushGate, LedgerError, LogStore, Result};

/// Validates incoming logs, fixes their leaf hash and persists them unbatched.
#[derive(Clone)]
pub struct LogIngestor {
    store: Arc<dyn LogStore>,
    gate: FlushGate,
}

impl LogIngestor {
    pub fn new(store: Arc<dyn LogStore>, gate: FlushGate) -> Self {
        Self { store, gate }
    }

    #[instrument(skip_all, fields(meter_id = %payload.meter_id))]
    pub async fn ingest(&self, payload: EnergyLogIn) -> Result<EnergyLog> {
        payload.validate()?;

        let leaf_hash = compute_log_leaf_hash(&payload)?;
        let log = EnergyLog {
            id: LogId::generate(),
            payload,
            leaf_hash,
            batch_id: None,
        };

        let _guard = self.gate.ingest().await;
        self.store.save_log(&log).await?;

        tracing::debug!(
            log_id = %log.id,
            leaf_hash = %hex::encode(log.leaf_hash),
            "Ingested energy log"
        );
        Ok(log)
    }

    pub async fn list_logs(&self) -> Result<Vec<EnergyLog>> {
        self.store.list_logs().await
    }

    pub async fn get_log(&self, id: &LogId) -> Result<EnergyLog> {
        self.store
            .get_log(id)
            .await?
            .ok_or_else(|| LedgerError::LogNotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::sample_log_in;
    use crate::infra::MockLogStore;

    #[tokio::test]
    async fn test_ingest_fixes_leaf_hash_and_saves_unbatched() {
        let mut store = MockLogStore::new();
        store
            .expect_save_log()
            .withf(|log| log.batch_id.is_none() && log.id.as_str().starts_with("log_"))
            .times(1)
            .returning(|_| Ok(()));

        let ingestor = LogIngestor::new(Arc::new(store), FlushGate::new());
        let payload = sample_log_in("m-1", 1.5);
        let expected = compute_log_leaf_hash(&payload).unwrap();

        let log = ingestor.ingest(payload).await.unwrap();
        assert_eq!(log.leaf_hash, expected);
    }

    #[tokio::test]
    async fn test_invalid_log_never_reaches_storage() {
        let mut store = MockLogStore::new();
        store.expect_save_log().never();

        let ingestor = LogIngestor::new(Arc::new(store), FlushGate::new());
        let mut payload = sample_log_in("m-1", 1.0);
        payload.interval_s = 0;

        let err = ingestor.ingest(payload).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(ref v) if v.field == "interval_s"));
    }

    #[tokio::test]
    async fn test_get_unknown_log() {
        let mut store = MockLogStore::new();
        store.expect_get_log().returning(|_| Ok(None));

        let ingestor = LogIngestor::new(Arc::new(store), FlushGate::new());
        let err = ingestor.get_log(&LogId::from("log_nope")).await.unwrap_err();
        assert!(matches!(err, LedgerError::LogNotFound(_)));
    }
}
