//! SQLite-backed [`LogStore`]

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    sqlite::{SqlitePool, SqlitePoolOptions},
    FromRow, Sqlite, Transaction,
};

use crate::domain::{
    parse_hash256, AnchorConfirmation, AnchorStatus, BatchId, EnergyBatch, EnergyLog,
    EnergyLogIn, LogId, LogStatus, SettlementChannel, SettlementStatus, TxInfo,
};
use crate::infra::{LedgerError, LogStore, Result};

const LOG_COLUMNS: &str = r#"
    id, schema_version, site_id, iot_device_id, meter_id,
    ts_start, ts_end, interval_s, energy_kwh, power_kw_avg,
    status, tags,
    tx_unit, tx_price_sats_per_kwh, tx_amount_sats, tx_channel,
    tx_settlement_status, tx_ln_invoice_id, tx_bitcoin_txid,
    leaf_hash, batch_id
"#;

const BATCH_COLUMNS: &str = r#"
    id, created_at, merkle_root, log_count,
    anchor_status, anchor_txid, anchor_block_hash,
    anchor_block_height, anchor_block_time
"#;

/// Pool settings for `url`.
///
/// An in-memory database lives only as long as its connection, so those URLs
/// get exactly one connection that is never reaped or recycled.
pub(crate) fn pool_options(url: &str, max_connections: u32) -> SqlitePoolOptions {
    if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    }
}

/// SQLite ledger store
pub struct SqliteLogStore {
    pool: SqlitePool,
}

impl SqliteLogStore {
    /// Create a store over an existing connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `url` with at most `max_connections` pooled connections.
    pub async fn from_url(url: &str, max_connections: u32) -> Result<Self> {
        let pool = pool_options(url, max_connections).connect(url).await?;
        Ok(Self { pool })
    }

    /// Initialize the database schema
    pub async fn initialize(&self) -> Result<()> {
        crate::migrations::run_sqlite(&self.pool)
            .await
            .map_err(|e| LedgerError::Configuration(format!("migration failed: {e}")))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_log_ids(&self, batch_id: &str) -> Result<Vec<LogId>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT log_id FROM batch_logs WHERE batch_id = ? ORDER BY position ASC",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| LogId(id)).collect())
    }

    async fn stamp_log(
        tx: &mut Transaction<'_, Sqlite>,
        batch_id: &BatchId,
        position: usize,
        log_id: &LogId,
    ) -> Result<()> {
        let stamped =
            sqlx::query("UPDATE energy_logs SET batch_id = ? WHERE id = ? AND batch_id IS NULL")
                .bind(batch_id.as_str())
                .bind(log_id.as_str())
                .execute(&mut **tx)
                .await?;

        if stamped.rows_affected() == 0 {
            let existing: Option<(Option<String>,)> =
                sqlx::query_as("SELECT batch_id FROM energy_logs WHERE id = ?")
                    .bind(log_id.as_str())
                    .fetch_optional(&mut **tx)
                    .await?;
            return Err(match existing {
                None => LedgerError::invariant(
                    "batch_member_exists",
                    format!("log {log_id} does not exist"),
                ),
                Some((prior,)) => LedgerError::invariant(
                    "single_batch_membership",
                    format!(
                        "log {log_id} already belongs to batch {}",
                        prior.unwrap_or_default()
                    ),
                ),
            });
        }

        sqlx::query("INSERT INTO batch_logs (batch_id, position, log_id) VALUES (?, ?, ?)")
            .bind(batch_id.as_str())
            .bind(position as i64)
            .bind(log_id.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[async_trait]
impl LogStore for SqliteLogStore {
    async fn save_log(&self, log: &EnergyLog) -> Result<()> {
        let p = &log.payload;
        let tags = serde_json::to_string(&p.tags)?;

        let result = sqlx::query(
            r#"
            INSERT INTO energy_logs (
                id, schema_version, site_id, iot_device_id, meter_id,
                ts_start, ts_end, interval_s, energy_kwh, power_kw_avg,
                status, tags,
                tx_unit, tx_price_sats_per_kwh, tx_amount_sats, tx_channel,
                tx_settlement_status, tx_ln_invoice_id, tx_bitcoin_txid,
                leaf_hash, batch_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.id.as_str())
        .bind(&p.schema_version)
        .bind(&p.site_id)
        .bind(&p.iot_device_id)
        .bind(&p.meter_id)
        .bind(ts(&p.ts_start))
        .bind(ts(&p.ts_end))
        .bind(p.interval_s as i64)
        .bind(p.energy_kwh)
        .bind(p.power_kw_avg)
        .bind(p.status.as_str())
        .bind(&tags)
        .bind(&p.tx.unit)
        .bind(p.tx.price_sats_per_kwh as i64)
        .bind(p.tx.amount_sats as i64)
        .bind(p.tx.channel.as_str())
        .bind(p.tx.settlement_status.as_str())
        .bind(p.tx.ln_invoice_id.as_deref())
        .bind(p.tx.bitcoin_txid.as_deref())
        .bind(hex::encode(log.leaf_hash))
        .bind(log.batch_id.as_ref().map(|b| b.as_str()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                LedgerError::invariant("unique_log_id", format!("log {} already exists", log.id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_log(&self, id: &LogId) -> Result<Option<EnergyLog>> {
        let row = sqlx::query_as::<_, EnergyLogRow>(&format!(
            "SELECT {LOG_COLUMNS} FROM energy_logs WHERE id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(EnergyLog::try_from).transpose()
    }

    async fn list_logs(&self) -> Result<Vec<EnergyLog>> {
        let rows = sqlx::query_as::<_, EnergyLogRow>(&format!(
            "SELECT {LOG_COLUMNS} FROM energy_logs ORDER BY seq ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EnergyLog::try_from).collect()
    }

    async fn list_unbatched_logs(&self) -> Result<Vec<EnergyLog>> {
        let rows = sqlx::query_as::<_, EnergyLogRow>(&format!(
            "SELECT {LOG_COLUMNS} FROM energy_logs WHERE batch_id IS NULL ORDER BY seq ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EnergyLog::try_from).collect()
    }

    async fn get_logs_by_batch(&self, batch_id: &BatchId) -> Result<Vec<EnergyLog>> {
        let rows = sqlx::query_as::<_, EnergyLogRow>(&format!(
            r#"
            SELECT {} FROM energy_logs l
            JOIN batch_logs bl ON bl.log_id = l.id
            WHERE bl.batch_id = ?
            ORDER BY bl.position ASC
            "#,
            LOG_COLUMNS
                .split(',')
                .map(|c| format!("l.{}", c.trim()))
                .collect::<Vec<_>>()
                .join(", ")
        ))
        .bind(batch_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EnergyLog::try_from).collect()
    }

    async fn commit_batch(&self, batch: &EnergyBatch) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM batches WHERE id = ?")
            .bind(batch.id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_some() {
            return Err(LedgerError::DuplicateBatch(batch.id.clone()));
        }

        sqlx::query(
            r#"
            INSERT INTO batches (
                id, created_at, merkle_root, log_count,
                anchor_status, anchor_txid, anchor_block_hash,
                anchor_block_height, anchor_block_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(batch.id.as_str())
        .bind(ts(&batch.created_at))
        .bind(hex::encode(batch.merkle_root))
        .bind(batch.log_count as i64)
        .bind(batch.anchor_status.as_str())
        .bind(batch.anchor_txid.as_deref())
        .bind(batch.anchor_block_hash.as_deref())
        .bind(batch.anchor_block_height.map(|h| h as i64))
        .bind(batch.anchor_block_time.as_ref().map(ts))
        .execute(&mut *tx)
        .await?;

        for (position, log_id) in batch.log_ids.iter().enumerate() {
            // Any error drops `tx`, rolling back the whole commit.
            Self::stamp_log(&mut tx, &batch.id, position, log_id).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_batch(&self, id: &BatchId) -> Result<Option<EnergyBatch>> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let log_ids = self.load_log_ids(&row.id).await?;
        row.into_batch(log_ids).map(Some)
    }

    async fn list_batches(&self) -> Result<Vec<EnergyBatch>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches ORDER BY seq ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let members: Vec<(String, String)> =
            sqlx::query_as("SELECT batch_id, log_id FROM batch_logs ORDER BY batch_id, position")
                .fetch_all(&self.pool)
                .await?;
        let mut by_batch: HashMap<String, Vec<LogId>> = HashMap::new();
        for (batch_id, log_id) in members {
            by_batch.entry(batch_id).or_default().push(LogId(log_id));
        }

        rows.into_iter()
            .map(|row| {
                let log_ids = by_batch.remove(&row.id).unwrap_or_default();
                row.into_batch(log_ids)
            })
            .collect()
    }

    async fn update_anchor(
        &self,
        batch_id: &BatchId,
        confirmation: &AnchorConfirmation,
        only_if_pending: bool,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE batches
            SET anchor_status = ?, anchor_txid = ?, anchor_block_hash = ?,
                anchor_block_height = ?, anchor_block_time = ?
            WHERE id = ? AND (? = 0 OR anchor_status = ?)
            "#,
        )
        .bind(AnchorStatus::Anchored.as_str())
        .bind(&confirmation.txid)
        .bind(&confirmation.block_hash)
        .bind(confirmation.block_height as i64)
        .bind(ts(&confirmation.block_time))
        .bind(batch_id.as_str())
        .bind(only_if_pending as i64)
        .bind(AnchorStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM batches WHERE id = ?")
            .bind(batch_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Ok(false),
            None => Err(LedgerError::BatchNotFound(batch_id.clone())),
        }
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Row types for SQLite queries

#[derive(Debug, FromRow)]
struct EnergyLogRow {
    id: String,
    schema_version: String,
    site_id: String,
    iot_device_id: String,
    meter_id: String,
    ts_start: String,
    ts_end: String,
    interval_s: i64,
    energy_kwh: f64,
    power_kw_avg: Option<f64>,
    status: String,
    tags: String,
    tx_unit: String,
    tx_price_sats_per_kwh: i64,
    tx_amount_sats: i64,
    tx_channel: String,
    tx_settlement_status: String,
    tx_ln_invoice_id: Option<String>,
    tx_bitcoin_txid: Option<String>,
    leaf_hash: String,
    batch_id: Option<String>,
}

fn parse_ts(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LedgerError::Internal(format!("Invalid {field}: {e}")))
}

fn parse_enum<T>(field: &str, value: &str, parse: fn(&str) -> Option<T>) -> Result<T> {
    parse(value).ok_or_else(|| LedgerError::Internal(format!("Invalid {field}: {value}")))
}

fn parse_hash(field: &str, value: &str) -> Result<crate::domain::Hash256> {
    parse_hash256(value).ok_or_else(|| LedgerError::Internal(format!("Invalid {field}: {value}")))
}

impl TryFrom<EnergyLogRow> for EnergyLog {
    type Error = LedgerError;

    fn try_from(row: EnergyLogRow) -> Result<Self> {
        let tags: Vec<String> = serde_json::from_str(&row.tags)
            .map_err(|e| LedgerError::Internal(format!("Invalid tags: {e}")))?;

        let payload = EnergyLogIn {
            schema_version: row.schema_version,
            site_id: row.site_id,
            iot_device_id: row.iot_device_id,
            meter_id: row.meter_id,
            ts_start: parse_ts("ts_start", &row.ts_start)?,
            ts_end: parse_ts("ts_end", &row.ts_end)?,
            interval_s: row.interval_s as u64,
            energy_kwh: row.energy_kwh,
            power_kw_avg: row.power_kw_avg,
            status: parse_enum("status", &row.status, LogStatus::parse)?,
            tags,
            tx: TxInfo {
                unit: row.tx_unit,
                price_sats_per_kwh: row.tx_price_sats_per_kwh as u64,
                amount_sats: row.tx_amount_sats as u64,
                channel: parse_enum("tx_channel", &row.tx_channel, SettlementChannel::parse)?,
                settlement_status: parse_enum(
                    "tx_settlement_status",
                    &row.tx_settlement_status,
                    SettlementStatus::parse,
                )?,
                ln_invoice_id: row.tx_ln_invoice_id,
                bitcoin_txid: row.tx_bitcoin_txid,
            },
        };

        Ok(EnergyLog {
            id: LogId(row.id),
            payload,
            leaf_hash: parse_hash("leaf_hash", &row.leaf_hash)?,
            batch_id: row.batch_id.map(BatchId),
        })
    }
}

#[derive(Debug, FromRow)]
struct BatchRow {
    id: String,
    created_at: String,
    merkle_root: String,
    log_count: i64,
    anchor_status: String,
    anchor_txid: Option<String>,
    anchor_block_hash: Option<String>,
    anchor_block_height: Option<i64>,
    anchor_block_time: Option<String>,
}

impl BatchRow {
    fn into_batch(self, log_ids: Vec<LogId>) -> Result<EnergyBatch> {
        if self.log_count as usize != log_ids.len() {
            return Err(LedgerError::invariant(
                "batch_log_count",
                format!(
                    "batch {} records {} logs but has {} members",
                    self.id,
                    self.log_count,
                    log_ids.len()
                ),
            ));
        }

        Ok(EnergyBatch {
            id: BatchId(self.id),
            created_at: parse_ts("created_at", &self.created_at)?,
            log_ids,
            merkle_root: parse_hash("merkle_root", &self.merkle_root)?,
            log_count: self.log_count as u32,
            anchor_status: parse_enum("anchor_status", &self.anchor_status, AnchorStatus::parse)?,
            anchor_txid: self.anchor_txid,
            anchor_block_hash: self.anchor_block_hash,
            anchor_block_height: self.anchor_block_height.map(|h| h as u64),
            anchor_block_time: self
                .anchor_block_time
                .as_deref()
                .map(|t| parse_ts("anchor_block_time", t))
                .transpose()?,
        })
    }
}
