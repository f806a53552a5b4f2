//! Batch anchoring
//!
//! Records the chain reference at which a batch's Merkle root was committed.
//! The ledger never talks to a chain itself: confirmations come from an
//! external collaborator, or from [`AnchorSimulator`] for local runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::crypto::sha256;
use crate::domain::{AnchorConfirmation, BatchId, EnergyBatch};
use crate::infra::{LedgerError, LogStore, Result};

/// Domain prefix for simulated transaction ids
const SIM_TX_PREFIX: &[u8] = b"ANCHOR_SIM::";
/// Domain prefix for simulated block hashes
const SIM_BLOCK_PREFIX: &[u8] = b"ANCHOR_SIM_BLOCK::";

/// What to do when a confirmation arrives for an already anchored batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnchorPolicy {
    /// Anchor fields are written once. Replaying the same confirmation is a
    /// no-op; a different one fails with `AlreadyAnchored`.
    #[default]
    WriteOnce,
    /// Later confirmations replace earlier ones.
    AllowOverwrite,
}

/// Anchor service configuration
#[derive(Debug, Clone)]
pub struct AnchorConfig {
    pub policy: AnchorPolicy,
    /// First block height handed out by the simulator
    pub sim_start_height: u64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            policy: AnchorPolicy::WriteOnce,
            sim_start_height: 800_000,
        }
    }
}

impl AnchorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let policy = match std::env::var("ANCHOR_ALLOW_OVERWRITE") {
            Ok(v) if matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") => {
                AnchorPolicy::AllowOverwrite
            }
            _ => AnchorPolicy::WriteOnce,
        };

        let sim_start_height = std::env::var("ANCHOR_SIM_START_HEIGHT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.sim_start_height);

        Self {
            policy,
            sim_start_height,
        }
    }
}

/// Moves batches from `pending` to `anchored`.
#[derive(Clone)]
pub struct AnchorLifecycle {
    store: Arc<dyn LogStore>,
    policy: AnchorPolicy,
}

impl AnchorLifecycle {
    pub fn new(store: Arc<dyn LogStore>, policy: AnchorPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> AnchorPolicy {
        self.policy
    }

    /// Apply an external confirmation and return the updated batch.
    #[instrument(skip(self, confirmation), fields(txid = %confirmation.txid))]
    pub async fn confirm(
        &self,
        batch_id: &BatchId,
        confirmation: AnchorConfirmation,
    ) -> Result<EnergyBatch> {
        let batch = self.load(batch_id).await?;

        if let Some(existing) = batch.anchor_confirmation() {
            if existing == confirmation {
                return Ok(batch);
            }
            if self.policy == AnchorPolicy::WriteOnce {
                return Err(LedgerError::AlreadyAnchored(batch_id.clone()));
            }
            warn!(
                batch_id = %batch_id,
                previous_txid = %existing.txid,
                "Overwriting anchor fields"
            );
        }

        let only_if_pending = self.policy == AnchorPolicy::WriteOnce;
        let written = self
            .store
            .update_anchor(batch_id, &confirmation, only_if_pending)
            .await?;

        let batch = self.load(batch_id).await?;
        if !written && batch.anchor_confirmation().as_ref() != Some(&confirmation) {
            // Lost a race against another confirmation.
            return Err(LedgerError::AlreadyAnchored(batch_id.clone()));
        }

        info!(
            batch_id = %batch_id,
            txid = %confirmation.txid,
            block_height = confirmation.block_height,
            "Batch anchored"
        );
        Ok(batch)
    }

    async fn load(&self, batch_id: &BatchId) -> Result<EnergyBatch> {
        self.store
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| LedgerError::BatchNotFound(batch_id.clone()))
    }
}

/// Stand-in for a chain client: mints deterministic-looking confirmations
/// and feeds them through [`AnchorLifecycle`].
pub struct AnchorSimulator {
    lifecycle: AnchorLifecycle,
    next_height: AtomicU64,
}

impl AnchorSimulator {
    pub fn new(lifecycle: AnchorLifecycle, start_height: u64) -> Self {
        Self {
            lifecycle,
            next_height: AtomicU64::new(start_height),
        }
    }

    /// Simulated transaction id committing `batch`'s root.
    pub fn simulated_txid(batch: &EnergyBatch) -> String {
        let mut data = Vec::with_capacity(SIM_TX_PREFIX.len() + 32 + batch.id.as_str().len());
        data.extend_from_slice(SIM_TX_PREFIX);
        data.extend_from_slice(&batch.merkle_root);
        data.extend_from_slice(batch.id.as_str().as_bytes());
        hex::encode(sha256(&data))
    }

    pub fn simulated_block_hash(txid: &str, height: u64) -> String {
        let mut data = Vec::with_capacity(SIM_BLOCK_PREFIX.len() + txid.len() + 8);
        data.extend_from_slice(SIM_BLOCK_PREFIX);
        data.extend_from_slice(txid.as_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        hex::encode(sha256(&data))
    }

    #[instrument(skip(self))]
    pub async fn simulate(&self, batch_id: &BatchId) -> Result<EnergyBatch> {
        let batch = self.lifecycle.load(batch_id).await?;
        if batch.is_anchored() && self.lifecycle.policy() == AnchorPolicy::WriteOnce {
            return Err(LedgerError::AlreadyAnchored(batch_id.clone()));
        }

        let height = self.next_height.fetch_add(1, Ordering::SeqCst);
        let txid = Self::simulated_txid(&batch);
        let confirmation = AnchorConfirmation {
            block_hash: Self::simulated_block_hash(&txid, height),
            txid,
            block_height: height,
            block_time: Utc::now(),
        };

        let result = self.lifecycle.confirm(batch_id, confirmation).await;
        if result.is_err() {
            // Hand the height back unless a later simulation already took the next one.
            let _ = self.next_height.compare_exchange(
                height + 1,
                height,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
        }
        result
    }
}
