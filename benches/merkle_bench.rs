//! Performance benchmarks for leaf hashing and the Merkle engine.
//!
//! Run with: cargo bench

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kwh_ledger::crypto::{build_proof, build_root, compute_log_leaf_hash, sha256, verify};
use kwh_ledger::domain::{EnergyLogIn, Hash256, LogStatus, TxInfo};
use kwh_ledger::infra::InMemoryLogStore;
use kwh_ledger::server::AppState;

fn leaves(count: usize) -> Vec<Hash256> {
    (0..count as u64).map(|i| sha256(&i.to_be_bytes())).collect()
}

fn sample_log(i: usize) -> EnergyLogIn {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    EnergyLogIn {
        schema_version: "emlog-1.1".to_string(),
        site_id: "site-01".to_string(),
        iot_device_id: "esp32-01".to_string(),
        meter_id: format!("meter-{i}"),
        ts_start: start,
        ts_end: start + chrono::Duration::minutes(15),
        interval_s: 900,
        energy_kwh: 0.25 + i as f64 / 100.0,
        power_kw_avg: Some(1.0),
        status: LogStatus::Ok,
        tags: vec!["pv".to_string()],
        tx: TxInfo {
            unit: "sats".to_string(),
            price_sats_per_kwh: 250,
            amount_sats: 63,
            channel: Default::default(),
            settlement_status: Default::default(),
            ln_invoice_id: None,
            bitcoin_txid: None,
        },
    }
}

/// Benchmark canonical leaf hashing
fn bench_leaf_hash(c: &mut Criterion) {
    let log = sample_log(1);
    c.bench_function("leaf_hash/energy_log", |b| {
        b.iter(|| black_box(compute_log_leaf_hash(black_box(&log)).unwrap()));
    });
}

/// Benchmark root construction
fn bench_build_root(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_root");

    for count in [1, 10, 100, 1000, 10_000].iter() {
        let leaves = leaves(*count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &leaves, |b, leaves| {
            b.iter(|| black_box(build_root(leaves)));
        });
    }

    group.finish();
}

/// Benchmark proof construction and verification
fn bench_proof(c: &mut Criterion) {
    let mut group = c.benchmark_group("proof");

    for count in [10, 1000, 10_000].iter() {
        let leaves = leaves(*count);
        let root = build_root(&leaves);
        let index = count / 2;
        let proof = build_proof(&leaves, index).unwrap();

        group.bench_with_input(BenchmarkId::new("build", count), &leaves, |b, leaves| {
            b.iter(|| black_box(build_proof(leaves, index).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("verify", count), &proof, |b, proof| {
            b.iter(|| black_box(verify(&leaves[index], &root, proof)));
        });
    }

    group.finish();
}

/// Benchmark a full ingest + flush cycle on in-memory storage
fn bench_flush(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("flush");

    for count in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.to_async(&runtime).iter(|| async move {
                let state = AppState::new(
                    std::sync::Arc::new(InMemoryLogStore::new()),
                    &Default::default(),
                );
                for i in 0..count {
                    state.ingestor.ingest(sample_log(i)).await.unwrap();
                }
                black_box(state.assembler.flush().await.unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_leaf_hash, bench_build_root, bench_proof, bench_flush);
criterion_main!(benches);
