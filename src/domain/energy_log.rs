//! Energy log types (canonical schema `emlog-1.1`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{hash256_hex, BatchId, Hash256, LogId};

/// Schema version stamped on every canonical log.
pub const SCHEMA_VERSION: &str = "emlog-1.1";

/// Largest integer the canonical number form renders exactly (2^53 - 1).
pub const MAX_EXACT_INT: u64 = (1 << 53) - 1;

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn default_unit() -> String {
    "sats".to_string()
}

/// Measurement quality reported by the meter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    #[default]
    Ok,
    Estimated,
    Error,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Ok => "ok",
            LogStatus::Estimated => "estimated",
            LogStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(LogStatus::Ok),
            "estimated" => Some(LogStatus::Estimated),
            "error" => Some(LogStatus::Error),
            _ => None,
        }
    }
}

/// Settlement rail for the interval's payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementChannel {
    #[default]
    Ln,
    Onchain,
    Internal,
}

impl SettlementChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementChannel::Ln => "ln",
            SettlementChannel::Onchain => "onchain",
            SettlementChannel::Internal => "internal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ln" => Some(SettlementChannel::Ln),
            "onchain" => Some(SettlementChannel::Onchain),
            "internal" => Some(SettlementChannel::Internal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    #[default]
    Pending,
    Settled,
    Failed,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Settled => "settled",
            SettlementStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SettlementStatus::Pending),
            "settled" => Some(SettlementStatus::Settled),
            "failed" => Some(SettlementStatus::Failed),
            _ => None,
        }
    }
}

/// Economic / Bitcoin view of an energy interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxInfo {
    /// Unit for pricing, e.g. sats
    #[serde(default = "default_unit")]
    pub unit: String,

    /// Price in sats per kWh
    pub price_sats_per_kwh: u64,

    /// Total amount in sats for this interval
    pub amount_sats: u64,

    #[serde(default)]
    pub channel: SettlementChannel,

    #[serde(default)]
    pub settlement_status: SettlementStatus,

    /// Lightning invoice identifier (if used)
    #[serde(default)]
    pub ln_invoice_id: Option<String>,

    /// Bitcoin transaction id (if on-chain)
    #[serde(default)]
    pub bitcoin_txid: Option<String>,
}

/// Canonical energy+BTC log as submitted by clients or the ingestion bridge.
///
/// The serde form of this struct is exactly what gets canonicalized and
/// hashed into the leaf, so field names and optional-field handling are part
/// of the commitment format. Optional fields are always serialized (as
/// `null` when absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyLogIn {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    pub site_id: String,
    pub iot_device_id: String,
    pub meter_id: String,

    pub ts_start: DateTime<Utc>,
    pub ts_end: DateTime<Utc>,
    pub interval_s: u64,

    pub energy_kwh: f64,
    #[serde(default)]
    pub power_kw_avg: Option<f64>,

    #[serde(default)]
    pub status: LogStatus,
    #[serde(default)]
    pub tags: Vec<String>,

    pub tx: TxInfo,
}

/// Boundary validation failure for an incoming log
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid field {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl EnergyLogIn {
    /// Check business-field constraints before the log reaches the engine.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("site_id", &self.site_id),
            ("iot_device_id", &self.iot_device_id),
            ("meter_id", &self.meter_id),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::new(field, "must not be empty"));
            }
        }

        if self.interval_s == 0 {
            return Err(ValidationError::new("interval_s", "must be greater than 0"));
        }

        for (field, value) in [
            ("interval_s", self.interval_s),
            ("tx.price_sats_per_kwh", self.tx.price_sats_per_kwh),
            ("tx.amount_sats", self.tx.amount_sats),
        ] {
            if value > MAX_EXACT_INT {
                return Err(ValidationError::new(
                    field,
                    format!("must not exceed {MAX_EXACT_INT}"),
                ));
            }
        }

        if !self.energy_kwh.is_finite() || self.energy_kwh < 0.0 {
            return Err(ValidationError::new(
                "energy_kwh",
                "must be a finite number >= 0",
            ));
        }

        if let Some(power) = self.power_kw_avg {
            if !power.is_finite() {
                return Err(ValidationError::new("power_kw_avg", "must be finite"));
            }
        }

        if self.ts_end < self.ts_start {
            return Err(ValidationError::new("ts_end", "must not precede ts_start"));
        }

        Ok(())
    }
}

/// Stored log: the submitted payload plus gateway-owned fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyLog {
    pub id: LogId,

    #[serde(flatten)]
    pub payload: EnergyLogIn,

    /// Leaf digest fixed at ingestion
    #[serde(with = "hash256_hex")]
    pub leaf_hash: Hash256,

    /// Batch this log was committed in; set at most once
    pub batch_id: Option<BatchId>,
}

impl EnergyLog {
    pub fn is_batched(&self) -> bool {
        self.batch_id.is_some()
    }
}
