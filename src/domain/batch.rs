//! Merkle batch and anchor metadata types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{hash256_hex, BatchId, Hash256, LogId};

/// External-commitment state of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorStatus {
    /// Created, root not yet committed externally
    #[default]
    Pending,
    /// Root confirmed in an external ledger
    Anchored,
}

impl AnchorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorStatus::Pending => "pending",
            AnchorStatus::Anchored => "anchored",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AnchorStatus::Pending),
            "anchored" => Some(AnchorStatus::Anchored),
            _ => None,
        }
    }
}

impl std::fmt::Display for AnchorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chain reference supplied by the anchoring collaborator.
///
/// The ledger records these fields as given; it never checks them against a
/// chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorConfirmation {
    pub txid: String,
    pub block_hash: String,
    pub block_height: u64,
    pub block_time: DateTime<Utc>,
}

/// Batch of logs summarized by a Merkle root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyBatch {
    pub id: BatchId,
    pub created_at: DateTime<Utc>,

    /// Member logs in commitment order
    pub log_ids: Vec<LogId>,

    #[serde(with = "hash256_hex")]
    pub merkle_root: Hash256,

    /// Always equals `log_ids.len()`
    pub log_count: u32,

    pub anchor_status: AnchorStatus,
    pub anchor_txid: Option<String>,
    pub anchor_block_hash: Option<String>,
    pub anchor_block_height: Option<u64>,
    pub anchor_block_time: Option<DateTime<Utc>>,
}

impl EnergyBatch {
    /// Create a pending batch over `log_ids` with the given root.
    pub fn new(
        id: BatchId,
        created_at: DateTime<Utc>,
        log_ids: Vec<LogId>,
        merkle_root: Hash256,
    ) -> Self {
        let log_count = log_ids.len() as u32;
        Self {
            id,
            created_at,
            log_ids,
            merkle_root,
            log_count,
            anchor_status: AnchorStatus::Pending,
            anchor_txid: None,
            anchor_block_hash: None,
            anchor_block_height: None,
            anchor_block_time: None,
        }
    }

    /// Check if this batch's root has been anchored
    pub fn is_anchored(&self) -> bool {
        self.anchor_status == AnchorStatus::Anchored
    }

    /// Current anchor fields, if anchored.
    pub fn anchor_confirmation(&self) -> Option<AnchorConfirmation> {
        if !self.is_anchored() {
            return None;
        }
        Some(AnchorConfirmation {
            txid: self.anchor_txid.clone()?,
            block_hash: self.anchor_block_hash.clone()?,
            block_height: self.anchor_block_height?,
            block_time: self.anchor_block_time?,
        })
    }

    /// Move to `anchored` with the supplied chain reference.
    pub fn apply_anchor(&mut self, confirmation: AnchorConfirmation) {
        self.anchor_status = AnchorStatus::Anchored;
        self.anchor_txid = Some(confirmation.txid);
        self.anchor_block_hash = Some(confirmation.block_hash);
        self.anchor_block_height = Some(confirmation.block_height);
        self.anchor_block_time = Some(confirmation.block_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation() -> AnchorConfirmation {
        AnchorConfirmation {
            txid: "aa".repeat(32),
            block_hash: "bb".repeat(32),
            block_height: 800_001,
            block_time: Utc::now(),
        }
    }

    #[test]
    fn test_batch_creation() {
        let batch = EnergyBatch::new(
            BatchId::from("batch_1"),
            Utc::now(),
            vec![LogId::from("log_a"), LogId::from("log_b")],
            [1u8; 32],
        );

        assert_eq!(batch.log_count, 2);
        assert_eq!(batch.anchor_status, AnchorStatus::Pending);
        assert!(!batch.is_anchored());
        assert!(batch.anchor_confirmation().is_none());
    }

    #[test]
    fn test_apply_anchor() {
        let mut batch = EnergyBatch::new(BatchId::from("batch_1"), Utc::now(), vec![], [0u8; 32]);
        let conf = confirmation();
        batch.apply_anchor(conf.clone());

        assert!(batch.is_anchored());
        assert_eq!(batch.anchor_confirmation(), Some(conf));
    }

    #[test]
    fn test_anchor_status_strings() {
        assert_eq!(AnchorStatus::parse("pending"), Some(AnchorStatus::Pending));
        assert_eq!(AnchorStatus::parse("anchored"), Some(AnchorStatus::Anchored));
        assert_eq!(AnchorStatus::parse("confirmed"), None);
        assert_eq!(AnchorStatus::Anchored.to_string(), "anchored");
    }

    #[test]
    fn test_batch_serializes_root_as_hex() {
        let batch = EnergyBatch::new(BatchId::from("batch_1"), Utc::now(), vec![], [0xab; 32]);
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["merkle_root"], "ab".repeat(32));
        assert_eq!(json["anchor_status"], "pending");
        assert!(json["anchor_txid"].is_null());
    }
}
