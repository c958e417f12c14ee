//! Merge-mining verification with header and auxpow doubles.

use crate::generators::*;
use crate::harness::*;
use num_bigint::BigUint;
use num_traits::One;
use wdc_consensus::params::AUXPOW_CHAIN_ID;
use wdc_consensus::{
    check_merge_mined_proof_of_work, next_work_required, BlockHeader, BlockVersion, ChainParams,
    CompactTarget, ConsensusError, Hash256, TargetRangeError, ValidationFailure,
};

fn target_bits() -> CompactTarget {
    CompactTarget::from_consensus(0x1d00_ffff)
}

fn target() -> BigUint {
    target_bits().decode().value
}

fn hash_at_target() -> Hash256 {
    hash_with_value(&target())
}

fn hash_above_target() -> Hash256 {
    hash_with_value(&(target() + BigUint::one()))
}

#[test]
fn test_pre_auxpow_header_checks_own_hash() {
    init_test_tracing();
    let params = ChainParams::mainnet();

    let header = TestHeader::plain(0x2000_0000, target_bits(), hash_at_target());
    assert!(!header.is_merge_mined());
    assert!(check_merge_mined_proof_of_work(&header, &params).is_ok());

    let header = TestHeader::plain(0x2000_0000, target_bits(), hash_above_target());
    assert!(matches!(
        check_merge_mined_proof_of_work(&header, &params),
        Err(ValidationFailure::ProofOfWorkInsufficient { .. })
    ));
}

#[test]
fn test_merge_mined_header_uses_parent_hash() {
    let params = ChainParams::mainnet();
    let header = TestHeader::merge_mined(AUXPOW_CHAIN_ID, target_bits(), hash_at_target());
    assert_eq!(header.chain_id(), AUXPOW_CHAIN_ID);
    assert!(check_merge_mined_proof_of_work(&header, &params).is_ok());
}

#[test]
fn test_parent_hash_one_above_target_fails() {
    let params = ChainParams::mainnet();
    let header = TestHeader::merge_mined(AUXPOW_CHAIN_ID, target_bits(), hash_above_target());
    let err = check_merge_mined_proof_of_work(&header, &params).unwrap_err();
    assert_eq!(
        err,
        ValidationFailure::ParentProofOfWorkInsufficient {
            source: Box::new(ValidationFailure::ProofOfWorkInsufficient {
                hash: target() + BigUint::one(),
                target: target(),
            }),
        }
    );
}

#[test]
fn test_parent_checked_against_pow_limit() {
    let params = ChainParams::mainnet();
    // Valid on regtest, too easy for mainnet
    let bits = CompactTarget::from_consensus(0x207f_ffff);
    let header = TestHeader::merge_mined(AUXPOW_CHAIN_ID, bits, Hash256::ZERO);
    let err = check_merge_mined_proof_of_work(&header, &params).unwrap_err();
    assert_eq!(
        err,
        ValidationFailure::ParentProofOfWorkInsufficient {
            source: Box::new(ValidationFailure::ProofOfWorkOutOfRange {
                bits,
                reason: TargetRangeError::AboveLimit,
            }),
        }
    );
    assert!(check_merge_mined_proof_of_work(&header, &ChainParams::regtest()).is_ok());
}

#[test]
fn test_commitment_mismatch_is_invalid_proof() {
    let params = ChainParams::mainnet();
    let mut header = TestHeader::merge_mined(AUXPOW_CHAIN_ID, target_bits(), hash_at_target());
    header.identity_hash = Hash256([0x11; 32]);
    assert_eq!(
        check_merge_mined_proof_of_work(&header, &params),
        Err(ValidationFailure::InvalidAuxpowProof)
    );
}

#[test]
fn test_strict_chain_id() {
    let foreign = 0x0062;
    let header = TestHeader::merge_mined(foreign, target_bits(), hash_at_target());

    let err = check_merge_mined_proof_of_work(&header, &ChainParams::mainnet()).unwrap_err();
    assert_eq!(
        err,
        ValidationFailure::WrongChainId {
            got: foreign,
            expected: AUXPOW_CHAIN_ID,
            version: header.version.to_consensus(),
        }
    );
    assert!(err.to_string().contains("got 98, expected 8287"));

    // Regtest does not enforce the chain id
    assert!(check_merge_mined_proof_of_work(&header, &ChainParams::regtest()).is_ok());
}

#[test]
fn test_auxpow_on_non_merge_mined_header() {
    let params = ChainParams::mainnet();

    let mut legacy = TestHeader::merge_mined(AUXPOW_CHAIN_ID, target_bits(), hash_at_target());
    legacy.version = BlockVersion::from_consensus(1);
    assert_eq!(
        check_merge_mined_proof_of_work(&legacy, &params),
        Err(ValidationFailure::LegacyBlockWithAuxpow)
    );

    // Chain id present but auxpow flag cleared
    let mut unflagged = TestHeader::merge_mined(AUXPOW_CHAIN_ID, target_bits(), hash_at_target());
    unflagged.version = BlockVersion::new(4, AUXPOW_CHAIN_ID, false);
    assert_eq!(
        check_merge_mined_proof_of_work(&unflagged, &params),
        Err(ValidationFailure::LegacyBlockWithAuxpow)
    );
}

#[test]
fn test_missing_auxpow() {
    let params = ChainParams::mainnet();
    let mut header = TestHeader::merge_mined(AUXPOW_CHAIN_ID, target_bits(), hash_at_target());
    header.auxpow = None;
    assert_eq!(
        check_merge_mined_proof_of_work(&header, &params),
        Err(ValidationFailure::AuxpowBlockMissingAuxpow)
    );
}

#[test]
fn test_validation_failures_are_not_fatal() {
    let failure = ValidationFailure::InvalidAuxpowProof;
    let err: ConsensusError = failure.into();
    assert!(!err.is_fatal());
}

#[test]
fn test_required_bits_then_merge_mined_check() {
    let params = compressed_eras();
    let (tree, tip) = steady_tree(60, 60, 0x1d00_ffff);
    let tip = tree.get(tip).unwrap();

    let bits = next_work_required(&tree, Some(tip), tip.time + 60, &params).unwrap();
    let at_target = hash_with_value(&bits.decode().value);
    let header = TestHeader::merge_mined(AUXPOW_CHAIN_ID, bits, at_target);
    assert!(check_merge_mined_proof_of_work(&header, &params).is_ok());

    let above = hash_with_value(&(bits.decode().value + BigUint::one()));
    let header = TestHeader::merge_mined(AUXPOW_CHAIN_ID, bits, above);
    assert!(matches!(
        check_merge_mined_proof_of_work(&header, &params),
        Err(ValidationFailure::ParentProofOfWorkInsufficient { .. })
    ));
}
