//! Merkle tree operations over SHA-256 leaves
//!
//! Tree shape:
//! - Empty leaf list commits to the all-zero sentinel [`EMPTY_ROOT`]
//! - A single leaf is its own root
//! - Any level with an odd count duplicates its last node before pairing
//! - `parent = SHA256(left || right)` over raw 32-byte digests
//!
//! Proofs are bottom-up lists of `{position, hash}` where `position` names
//! the side of the *sibling*: `left` means `H(sibling || current)`, `right`
//! means `H(current || sibling)`.

use thiserror::Error;

use super::hash_pair;
use crate::domain::{
    parse_hash256, Hash256, Position, ProofDocument, ProofStep, RawProofStep, EMPTY_ROOT,
};

/// Errors raised by proof construction and verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// Proof requested for a position outside the leaf list
    #[error("leaf index {index} out of range for {len} leaves")]
    IndexOutOfRange { index: usize, len: usize },

    /// Malformed proof step in externally supplied input
    #[error("invalid proof step {step}: {reason}")]
    InvalidProofStep { step: usize, reason: String },

    /// Field that should hold a 64-char hex digest does not
    #[error("invalid hash in {field}: expected 64 lowercase hex characters")]
    InvalidHash { field: String },
}

/// Reduce one level: duplicate the last node when odd, then hash pairs.
fn next_level(level: &mut Vec<Hash256>) -> Vec<Hash256> {
    if level.len() % 2 == 1 {
        let last = level[level.len() - 1];
        level.push(last);
    }
    level
        .chunks_exact(2)
        .map(|pair| hash_pair(&pair[0], &pair[1]))
        .collect()
}

/// Build the Merkle root of an ordered leaf list.
pub fn build_root(leaves: &[Hash256]) -> Hash256 {
    if leaves.is_empty() {
        return EMPTY_ROOT;
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&mut level);
    }
    level[0]
}

/// Build the inclusion proof for the leaf at `index`.
///
/// Mirrors [`build_root`] level by level, so a proof and the root built from
/// the same leaves always agree.
pub fn build_proof(leaves: &[Hash256], index: usize) -> Result<Vec<ProofStep>, MerkleError> {
    if index >= leaves.len() {
        return Err(MerkleError::IndexOutOfRange {
            index,
            len: leaves.len(),
        });
    }

    let mut level = leaves.to_vec();
    let mut idx = index;
    let mut proof = Vec::new();

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }

        let step = if idx % 2 == 0 {
            ProofStep::new(Position::Right, level[idx + 1])
        } else {
            ProofStep::new(Position::Left, level[idx - 1])
        };
        proof.push(step);

        level = next_level(&mut level);
        idx /= 2;
    }

    Ok(proof)
}

/// Fold a proof from `leaf` upwards and compare with `root`.
pub fn verify(leaf: &Hash256, root: &Hash256, proof: &[ProofStep]) -> bool {
    let computed = proof.iter().fold(*leaf, |current, step| match step.position {
        Position::Left => hash_pair(&step.hash, &current),
        Position::Right => hash_pair(&current, &step.hash),
    });
    computed == *root
}

fn parse_hash_field(field: &str, value: &str) -> Result<Hash256, MerkleError> {
    parse_hash256(value).ok_or_else(|| MerkleError::InvalidHash {
        field: field.to_string(),
    })
}

/// Parse one untrusted proof step.
pub fn parse_proof_step(step: usize, raw: &RawProofStep) -> Result<ProofStep, MerkleError> {
    let position = match raw.position.as_str() {
        "left" => Position::Left,
        "right" => Position::Right,
        other => {
            return Err(MerkleError::InvalidProofStep {
                step,
                reason: format!("unknown position {other:?}"),
            })
        }
    };

    let hash = parse_hash256(&raw.hash).ok_or_else(|| MerkleError::InvalidProofStep {
        step,
        reason: "hash must be 64 lowercase hex characters".to_string(),
    })?;

    Ok(ProofStep { position, hash })
}

/// Verify a proof given as hex strings, as received at a trust boundary.
pub fn verify_hex(leaf: &str, root: &str, proof: &[RawProofStep]) -> Result<bool, MerkleError> {
    let leaf = parse_hash_field("leaf_hash", leaf)?;
    let root = parse_hash_field("merkle_root", root)?;
    let steps = proof
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_proof_step(i, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(verify(&leaf, &root, &steps))
}

/// Verify an interchange document using only its leaf, root and path.
pub fn verify_document(doc: &ProofDocument) -> Result<bool, MerkleError> {
    verify_hex(&doc.leaf_hash, &doc.merkle_root, &doc.proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;

    fn leaves(n: usize) -> Vec<Hash256> {
        (0..n).map(|i| sha256(format!("leaf-{i}").as_bytes())).collect()
    }

    #[test]
    fn test_empty_root_is_zero_sentinel() {
        assert_eq!(hex::encode(build_root(&[])), "0".repeat(64));
    }

    #[test]
    fn test_single_leaf_is_root() {
        let l = leaves(1);
        assert_eq!(build_root(&l), l[0]);
        assert!(build_proof(&l, 0).unwrap().is_empty());
        assert!(verify(&l[0], &l[0], &[]));
    }

    #[test]
    fn test_two_leaves() {
        let l = leaves(2);
        assert_eq!(build_root(&l), hash_pair(&l[0], &l[1]));
    }

    #[test]
    fn test_odd_leaf_duplication() {
        let l = leaves(3);
        let p1 = hash_pair(&l[0], &l[1]);
        let p2 = hash_pair(&l[2], &l[2]);
        assert_eq!(build_root(&l), build_root(&[p1, p2]));
        assert_eq!(build_root(&l), hash_pair(&p1, &p2));
    }

    #[test]
    fn test_odd_duplication_at_upper_level() {
        // 5 leaves -> 3 parents -> duplicated to 4 -> 2 -> 1
        let l = leaves(5);
        let a = hash_pair(&l[0], &l[1]);
        let b = hash_pair(&l[2], &l[3]);
        let c = hash_pair(&l[4], &l[4]);
        let expected = hash_pair(&hash_pair(&a, &b), &hash_pair(&c, &c));
        assert_eq!(build_root(&l), expected);
    }

    #[test]
    fn test_order_sensitivity() {
        let l = leaves(2);
        assert_ne!(build_root(&[l[0], l[1]]), build_root(&[l[1], l[0]]));
    }

    #[test]
    fn test_proof_positions_for_middle_of_three() {
        let l = leaves(3);
        let proof = build_proof(&l, 1).unwrap();

        assert_eq!(proof.len(), 2);
        assert_eq!(proof[0], ProofStep::new(Position::Left, l[0]));
        assert_eq!(
            proof[1],
            ProofStep::new(Position::Right, hash_pair(&l[2], &l[2]))
        );
    }

    #[test]
    fn test_last_odd_leaf_proves_against_its_duplicate() {
        let l = leaves(3);
        let proof = build_proof(&l, 2).unwrap();
        assert_eq!(proof[0], ProofStep::new(Position::Right, l[2]));
        assert!(verify(&l[2], &build_root(&l), &proof));
    }

    #[test]
    fn test_every_index_verifies() {
        for n in 1..=17 {
            let l = leaves(n);
            let root = build_root(&l);
            for (i, leaf) in l.iter().enumerate() {
                let proof = build_proof(&l, i).unwrap();
                assert!(verify(leaf, &root, &proof), "n={n} i={i}");
            }
        }
    }

    #[test]
    fn test_index_out_of_range() {
        let l = leaves(3);
        assert_eq!(
            build_proof(&l, 3),
            Err(MerkleError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            build_proof(&[], 0),
            Err(MerkleError::IndexOutOfRange { index: 0, len: 0 })
        );
    }

    #[test]
    fn test_wrong_leaf_fails() {
        let l = leaves(4);
        let root = build_root(&l);
        let proof = build_proof(&l, 1).unwrap();
        assert!(!verify(&l[2], &root, &proof));
    }

    #[test]
    fn test_flipped_position_fails() {
        let l = leaves(4);
        let root = build_root(&l);
        let mut proof = build_proof(&l, 1).unwrap();
        proof[0].position = Position::Right;
        assert!(!verify(&l[1], &root, &proof));
    }

    #[test]
    fn test_verify_hex_roundtrip() {
        let l = leaves(6);
        let root = build_root(&l);
        let raw: Vec<RawProofStep> = build_proof(&l, 4)
            .unwrap()
            .into_iter()
            .map(RawProofStep::from)
            .collect();

        assert_eq!(
            verify_hex(&hex::encode(l[4]), &hex::encode(root), &raw),
            Ok(true)
        );
    }

    #[test]
    fn test_verify_hex_rejects_unknown_position() {
        let l = leaves(2);
        let raw = vec![RawProofStep {
            position: "up".to_string(),
            hash: hex::encode(l[1]),
        }];

        let err = verify_hex(&hex::encode(l[0]), &hex::encode(build_root(&l)), &raw).unwrap_err();
        assert!(matches!(err, MerkleError::InvalidProofStep { step: 0, .. }));
    }

    #[test]
    fn test_verify_hex_rejects_bad_sibling_hash() {
        let l = leaves(2);
        let raw = vec![RawProofStep {
            position: "right".to_string(),
            hash: "abc".to_string(),
        }];

        let err = verify_hex(&hex::encode(l[0]), &hex::encode(build_root(&l)), &raw).unwrap_err();
        assert!(matches!(err, MerkleError::InvalidProofStep { step: 0, .. }));
    }

    #[test]
    fn test_verify_hex_rejects_bad_leaf() {
        let err = verify_hex("not-hex", &"00".repeat(32), &[]).unwrap_err();
        assert_eq!(
            err,
            MerkleError::InvalidHash {
                field: "leaf_hash".to_string()
            }
        );
    }

    #[test]
    fn test_verify_hex_requires_lowercase() {
        let l = leaves(2);
        let root = build_root(&l);
        let raw: Vec<RawProofStep> = build_proof(&l, 0)
            .unwrap()
            .into_iter()
            .map(RawProofStep::from)
            .collect();

        let upper_root = hex::encode_upper(root);
        let err = verify_hex(&hex::encode(l[0]), &upper_root, &raw).unwrap_err();
        assert_eq!(
            err,
            MerkleError::InvalidHash {
                field: "merkle_root".to_string()
            }
        );

        let mut upper_step = raw.clone();
        upper_step[0].hash = upper_step[0].hash.to_uppercase();
        let err = verify_hex(&hex::encode(l[0]), &hex::encode(root), &upper_step).unwrap_err();
        assert!(matches!(err, MerkleError::InvalidProofStep { step: 0, .. }));
    }

    #[test]
    fn test_empty_proof_against_zero_root() {
        let l = leaves(1);
        assert!(!verify(&l[0], &EMPTY_ROOT, &[]));
    }
}
