//! Mutual exclusion between flushes and ingestion

use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Shared/exclusive guard around the "select unbatched + stamp" sequence.
///
/// Ingestion takes the shared side so any number of records can be saved
/// concurrently. A flush takes the exclusive side, so it never overlaps
/// another flush and never observes a half-ingested record.
#[derive(Clone, Default)]
pub struct FlushGate {
    lock: Arc<RwLock<()>>,
}

impl FlushGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ingest(&self) -> OwnedRwLockReadGuard<()> {
        self.lock.clone().read_owned().await
    }

    pub async fn flush(&self) -> OwnedRwLockWriteGuard<()> {
        self.lock.clone().write_owned().await
    }
}
