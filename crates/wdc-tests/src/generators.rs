//! Test data generators for integration tests.
//!
//! Chain builders with fixed bits, hashes with a chosen integer value, and
//! parameter sets with short windows so every era is reachable in a few
//! hundred blocks.

use crate::harness::{BlockTree, NodeId};
use num_bigint::BigUint;
use wdc_consensus::{ChainParams, CompactTarget, Hash256};

/// Timestamp of every generated genesis block.
pub const GENESIS_TIME: i64 = 1_387_000_000;

/// Mainnet pow limit in compact form.
pub const MAINNET_LIMIT_BITS: u32 = 0x1e0f_ffff;

/// A chain of `len` blocks spaced `spacing` seconds apart, all carrying `bits`.
pub fn steady_tree(len: u32, spacing: i64, bits: u32) -> (BlockTree, NodeId) {
    tree_from_gaps(std::iter::repeat(spacing).take(len.saturating_sub(1) as usize), bits)
}

/// A chain whose block `i + 1` arrives `gaps[i]` seconds after block `i`.
pub fn tree_from_gaps(gaps: impl IntoIterator<Item = i64>, bits: u32) -> (BlockTree, NodeId) {
    let bits = CompactTarget::from_consensus(bits);
    let mut tree = BlockTree::with_genesis(GENESIS_TIME, bits);
    let mut tip = 0;
    let mut time = GENESIS_TIME;
    for gap in gaps {
        time += gap;
        tip = tree.extend(tip, time, bits);
    }
    (tree, tip)
}

/// Hash whose little-endian integer value is `value`.
pub fn hash_with_value(value: &BigUint) -> Hash256 {
    Hash256::from_biguint(value)
}

/// Mainnet rules with every era squeezed into the first few hundred blocks.
///
/// Legacy window 4 blocks of 30s, era 2 from 20, auxpow from 40, Digishield
/// from 60, LWMA-3 (N = 10) from 100.
pub fn compressed_eras() -> ChainParams {
    ChainParams::from_toml_str(COMPRESSED_ERAS_TOML).expect("compressed era config is valid")
}

/// TOML form of [`compressed_eras`].
pub const COMPRESSED_ERAS_TOML: &str = r#"
pow_limit_hex = "00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
pow_target_spacing = 30
target_spacing_era2 = 60
pow_target_timespan = 120
digishield_target_timespan = 60
target_timespan_era2 = 60
lwma_target_timespan = 60
lwma_averaging_window = 10
height_era2 = 20
height_auxpow = 40
height_digishield = 60
height_lwma = 100
strict_chain_id = true
auxpow_chain_id = 0x205f
"#;
