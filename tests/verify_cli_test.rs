//! Tests for the standalone `kwh-ledger-verify` binary.

use std::io::Write;
use std::process::Command;

use kwh_ledger::crypto::{build_proof, build_root, sha256};
use kwh_ledger::domain::{BatchId, LogId, ProofDocument, ProofResult};

fn run(path: &std::path::Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_kwh-ledger-verify"))
        .arg(path)
        .output()
        .expect("run verifier")
}

fn document() -> ProofDocument {
    let leaves: Vec<_> = (0u8..5).map(|i| sha256(&[i])).collect();
    let root = build_root(&leaves);
    ProofDocument::from(ProofResult {
        log_id: LogId::from("log_0123456789ab"),
        batch_id: BatchId::from("batch_test"),
        leaf_hash: leaves[3],
        merkle_root: root,
        index: 3,
        proof: build_proof(&leaves, 3).unwrap(),
    })
}

fn write(doc: &serde_json::Value) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(doc.to_string().as_bytes()).unwrap();
    file
}

#[test]
fn test_valid_proof_exits_zero() {
    let file = write(&serde_json::to_value(document()).unwrap());
    let output = run(file.path());
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("VALID"));
}

#[test]
fn test_invalid_proof_exits_one() {
    let mut doc = serde_json::to_value(document()).unwrap();
    doc["merkle_root"] = serde_json::json!("00".repeat(32));
    let file = write(&doc);

    let output = run(file.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("INVALID"));
}

#[test]
fn test_malformed_input_exits_one() {
    let file = write(&serde_json::json!({ "leaf_hash": "abc" }));
    assert_eq!(run(file.path()).status.code(), Some(1));

    let missing = std::path::Path::new("/nonexistent/proof.json");
    assert_eq!(run(missing).status.code(), Some(1));
}
