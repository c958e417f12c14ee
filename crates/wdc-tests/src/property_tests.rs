//! Property-based tests using proptest.
//!
//! These check the codec, proof-of-work, retargeting and subsidy rules over
//! randomly generated inputs with shrinking support.

use crate::generators::*;
use crate::harness::*;
use num_bigint::BigUint;
use proptest::prelude::*;
use wdc_consensus::{
    block_subsidy, check_proof_of_work, day_of, lwma3_next_target, next_work_required,
    ChainParams, CompactTarget, DifficultyCalculator, Era, Hash256, HeaderFields, BLOCKS_PER_YEAR,
    MIN_SUBSIDY,
};

// ============================================================================
// Strategies
// ============================================================================

/// Arbitrary 256-bit values, biased toward short ones.
fn arb_u256() -> impl Strategy<Value = BigUint> {
    prop::collection::vec(any::<u8>(), 1..=32).prop_map(|bytes| BigUint::from_bytes_le(&bytes))
}

/// Non-zero targets no easier than the mainnet limit.
fn arb_mainnet_target() -> impl Strategy<Value = BigUint> {
    arb_u256().prop_map(|v| {
        let limit = ChainParams::mainnet().pow_limit().clone();
        let v = v % &limit;
        if v == BigUint::from(0u32) {
            limit
        } else {
            v
        }
    })
}

/// Compact targets between 2^200 and 2^232, far enough below the mainnet
/// limit that a +50% swing never reaches it.
fn arb_working_bits() -> impl Strategy<Value = CompactTarget> {
    (0x1au32..=0x1cu32, 0x00_8000u32..=0x7f_ffffu32)
        .prop_map(|(size, word)| CompactTarget::from_consensus((size << 24) | word))
}

fn arb_hash() -> impl Strategy<Value = Hash256> {
    prop::array::uniform32(any::<u8>()).prop_map(Hash256)
}

fn with_heights([era2, auxpow, digishield, lwma]: [u32; 4]) -> ChainParams {
    ChainParams::mainnet().with_era_heights(era2, auxpow, digishield, lwma)
}

fn arb_era_heights() -> impl Strategy<Value = [u32; 4]> {
    prop::array::uniform4(any::<u32>()).prop_map(|mut heights| {
        heights.sort_unstable();
        heights
    })
}

// ============================================================================
// Compact codec
// ============================================================================

proptest! {
    /// Encoding is canonical: decode then encode gives the same bits back.
    #[test]
    fn compact_canonical_round_trip(value in arb_u256()) {
        let bits = CompactTarget::encode(&value);
        let decoded = bits.decode();
        prop_assert!(!decoded.is_negative);
        prop_assert!(!decoded.is_overflow);
        prop_assert_eq!(CompactTarget::encode(&decoded.value), bits);
    }

    /// Encoding keeps the leading bytes and truncates the rest.
    #[test]
    fn compact_truncates_downward(value in arb_u256()) {
        let decoded = CompactTarget::encode(&value).decode().value;
        prop_assert!(decoded <= value);
        if value.bits() <= 23 {
            prop_assert_eq!(decoded, value);
        } else {
            let lost = &value - &decoded;
            prop_assert!(lost < (BigUint::from(1u32) << (value.bits() - 16) as usize));
        }
    }
}

// ============================================================================
// Proof of work
// ============================================================================

proptest! {
    /// For an in-range target the check passes exactly when hash <= target.
    #[test]
    fn pow_passes_iff_hash_at_most_target(hash in arb_hash(), target in arb_mainnet_target()) {
        let params = ChainParams::mainnet();
        let bits = CompactTarget::encode(&target);
        let decoded = bits.decode().value;

        let result = check_proof_of_work(&hash, bits, &params);
        prop_assert_eq!(result.is_ok(), hash.to_biguint() <= decoded);
    }

    /// A hash equal to the decoded target always passes.
    #[test]
    fn pow_boundary_passes(target in arb_mainnet_target()) {
        let params = ChainParams::mainnet();
        let bits = CompactTarget::encode(&target);
        let hash = hash_with_value(&bits.decode().value);
        prop_assert!(check_proof_of_work(&hash, bits, &params).is_ok());
    }
}

// ============================================================================
// Retargeting
// ============================================================================

proptest! {
    /// Genesis always gets the pow limit, whatever the era layout.
    #[test]
    fn genesis_is_pow_limit(heights in arb_era_heights()) {
        let params = with_heights(heights);
        let (tree, _) = steady_tree(1, 60, MAINNET_LIMIT_BITS);
        let bits = next_work_required(&tree, None, GENESIS_TIME, &params).unwrap();
        prop_assert_eq!(bits, CompactTarget::encode(params.pow_limit()));
    }

    /// Era resolution never goes backwards as height grows.
    #[test]
    fn era_is_monotonic(heights in arb_era_heights(), a in any::<u32>(), b in any::<u32>()) {
        let params = with_heights(heights);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(Era::at(low, &params) <= Era::at(high, &params));
    }

    /// Digishield leaves the target untouched when the block was on time.
    #[test]
    fn digishield_no_op_at_target(bits in arb_working_bits(), time in 1_500_000_000i64..2_000_000_000) {
        let params = ChainParams::mainnet();
        let calc = DifficultyCalculator::new(&params);
        let tip = HeaderFields {
            height: params.height_digishield + 10,
            time,
            bits,
        };
        let next = calc.calculate_classic_target(&tip, time - params.digishield_target_timespan);
        prop_assert_eq!(next, bits);
    }

    /// The classic calculator never returns a target easier than the limit.
    #[test]
    fn classic_never_exceeds_limit(
        bits in arb_working_bits(),
        height in any::<u32>(),
        actual in -1_000_000i64..10_000_000,
    ) {
        let params = ChainParams::mainnet();
        let calc = DifficultyCalculator::new(&params);
        let tip = HeaderFields { height: height.saturating_sub(1), time: 1_600_000_000, bits };
        let next = calc.calculate_classic_target(&tip, 1_600_000_000 - actual);
        prop_assert!(next.decode().value <= *params.pow_limit());
    }

    /// LWMA-3 moves at most -33% / +50% per block.
    #[test]
    fn lwma_swing_bound(
        gaps in prop::collection::vec(-600i64..3_000, 10..40),
        window_bits in prop::collection::vec(arb_working_bits(), 40),
    ) {
        let params = compressed_eras();
        let mut tree = BlockTree::with_genesis(GENESIS_TIME, window_bits[0]);
        let mut tip = 0;
        let mut time = GENESIS_TIME;
        for (gap, bits) in gaps.iter().zip(window_bits.iter().skip(1)) {
            time += gap;
            tip = tree.extend(tip, time, *bits);
        }
        let tip = tree.get(tip).unwrap();

        let next = lwma3_next_target(&tree, tip, &params).unwrap().decode().value;
        let previous = tip.bits.decode().value;
        let upper = &previous * 150u32 / 100u32;
        let lower = CompactTarget::encode(&(&previous * 67u32 / 100u32)).decode().value;
        prop_assert!(next <= upper);
        prop_assert!(next >= lower);
    }
}

// ============================================================================
// Subsidy
// ============================================================================

proptest! {
    /// No block pays less than the floor.
    #[test]
    fn subsidy_at_least_floor(height in any::<u32>()) {
        prop_assert!(block_subsidy(height) >= MIN_SUBSIDY);
    }

    /// One year later the subsidy is exactly half, away from bonus days.
    #[test]
    fn subsidy_halves_yearly(height in 4_320u32..BLOCKS_PER_YEAR) {
        let no_bonus = |day: u32| day % 31 != 0 && day % 14 != 0;
        prop_assume!(no_bonus(day_of(height)));
        prop_assume!(no_bonus(day_of(height + BLOCKS_PER_YEAR)));

        prop_assert_eq!(block_subsidy(height + BLOCKS_PER_YEAR) * 2, block_subsidy(height));
    }

    /// Later years never pay more for the same point in the season.
    #[test]
    fn subsidy_non_increasing_by_year(height in 4_320u32..BLOCKS_PER_YEAR, years in 1u32..8) {
        let later = height + years * BLOCKS_PER_YEAR;
        let same_multiplier = |day: u32| (day % 31 == 0, day % 14 == 0);
        prop_assume!(same_multiplier(day_of(height)) == same_multiplier(day_of(later)));
        prop_assert!(block_subsidy(later) <= block_subsidy(height));
    }
}
