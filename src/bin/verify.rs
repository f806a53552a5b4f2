use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::ExitCode;

use kwh_ledger::crypto::verify_document;
use kwh_ledger::domain::ProofDocument;

fn print_help() {
    eprintln!(
        "\
kwh-ledger-verify

Checks a Merkle inclusion proof offline. Only leaf_hash, merkle_root and
proof[] are used; nothing is fetched from the ledger. Hashes must be
64 lowercase hex characters.

USAGE:
  kwh-ledger-verify <proof.json>

  curl http://127.0.0.1:8000/api/v1/logs/<log_id>/proof > proof.json
  kwh-ledger-verify proof.json

EXIT CODE:
  0  proof is valid
  1  proof is invalid, or the file could not be read
"
    );
}

fn load(path: &PathBuf) -> anyhow::Result<ProofDocument> {
    if !path.is_file() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        anyhow::anyhow!("Invalid proof JSON (need leaf_hash, merkle_root, proof[]): {e}")
    })
}

fn main() -> ExitCode {
    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let path = match (args.pop_front(), args.is_empty()) {
        (Some(arg), _) if matches!(arg.as_str(), "-h" | "--help" | "help") => {
            print_help();
            return ExitCode::SUCCESS;
        }
        (Some(arg), true) => PathBuf::from(arg),
        _ => {
            eprintln!("Usage: kwh-ledger-verify <proof.json>");
            return ExitCode::FAILURE;
        }
    };

    let document = match load(&path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match verify_document(&document) {
        Ok(true) => {
            println!("ok: Merkle proof is VALID for the given root");
            if let Some(log_id) = &document.log_id {
                println!("  log_id:      {log_id}");
            }
            println!("  leaf_hash:   {}", document.leaf_hash);
            println!("  merkle_root: {}", document.merkle_root);
            println!("  proof_depth: {}", document.proof.len());
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("FAIL: Merkle proof is INVALID for the given root");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Invalid proof JSON: {e}");
            ExitCode::FAILURE
        }
    }
}
