//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use kwh_ledger::anchor::AnchorConfig;
use kwh_ledger::domain::{EnergyLogIn, LogStatus, SettlementChannel, SettlementStatus, TxInfo};
use kwh_ledger::infra::{InMemoryLogStore, LogStore, SqliteLogStore};
use kwh_ledger::server::AppState;

/// A 15-minute PV interval on `meter_id` delivering `energy_kwh`.
pub fn energy_log(meter_id: &str, energy_kwh: f64) -> EnergyLogIn {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    EnergyLogIn {
        schema_version: "emlog-1.1".to_string(),
        site_id: "site-01".to_string(),
        iot_device_id: "esp32-01".to_string(),
        meter_id: meter_id.to_string(),
        ts_start: start,
        ts_end: start + chrono::Duration::minutes(15),
        interval_s: 900,
        energy_kwh,
        power_kw_avg: Some(energy_kwh * 4.0),
        status: LogStatus::Ok,
        tags: vec!["pv".to_string()],
        tx: TxInfo {
            unit: "sats".to_string(),
            price_sats_per_kwh: 250,
            amount_sats: (energy_kwh * 250.0).round() as u64,
            channel: SettlementChannel::Ln,
            settlement_status: SettlementStatus::Pending,
            ln_invoice_id: None,
            bitcoin_txid: None,
        },
    }
}

/// JSON body for `POST /api/v1/logs`, relying on server-side defaults.
pub fn energy_log_json(meter_id: &str, energy_kwh: f64) -> serde_json::Value {
    serde_json::json!({
        "site_id": "site-01",
        "iot_device_id": "esp32-01",
        "meter_id": meter_id,
        "ts_start": "2026-01-01T00:00:00Z",
        "ts_end": "2026-01-01T00:15:00Z",
        "interval_s": 900,
        "energy_kwh": energy_kwh,
        "power_kw_avg": energy_kwh * 4.0,
        "tags": ["pv"],
        "tx": {
            "price_sats_per_kwh": 250,
            "amount_sats": (energy_kwh * 250.0).round() as u64
        }
    })
}

pub fn memory_store() -> Arc<dyn LogStore> {
    Arc::new(InMemoryLogStore::new())
}

pub async fn sqlite_store() -> Arc<SqliteLogStore> {
    let store = SqliteLogStore::from_url("sqlite::memory:", 1)
        .await
        .expect("open in-memory sqlite");
    store.initialize().await.expect("apply migrations");
    Arc::new(store)
}

pub fn state(store: Arc<dyn LogStore>) -> AppState {
    AppState::new(store, &AnchorConfig::default())
}
