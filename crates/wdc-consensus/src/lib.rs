//! # wdc-consensus
//!
//! Consensus arithmetic for the Worldcoin blockchain.
//!
//! This crate provides:
//! - Compact target encoding and the proof-of-work check
//! - Difficulty retargeting across every historical era
//! - Merge-mined (auxpow) proof-of-work verification
//! - The block subsidy schedule
//!
//! ## Retargeting eras
//!
//! The rules in force are selected by block height, so old blocks keep
//! validating under the rules they were mined with:
//!
//! | Era | Window | Clamp |
//! |-----|--------|-------|
//! | Legacy | 3.5 days | 4x |
//! | Era 2 | every block | 10% |
//! | Auxpow | every block | 16x |
//! | Digishield | every block | -25% / +50%, damped by 8 |
//! | LWMA-3 | every block, N = 90 | -33% / +50% |
//!
//! All 256-bit arithmetic wraps modulo 2^256 and every division truncates,
//! matching the values already recorded in the chain.
//!
//! Nothing here does I/O or holds state; block storage is reached through the
//! [`ChainIndex`] trait and headers through [`BlockHeader`].

mod auxpow;
mod chain;
mod chain_params;
mod compact;
mod difficulty;
mod era;
mod error;
mod lwma;
mod pow;
mod subsidy;

#[cfg(test)]
mod test_helpers;

pub use auxpow::{
    check_merge_mined_proof_of_work, AuxPowProof, BlockHeader, BlockVersion, VERSION_AUXPOW,
    VERSION_CHAIN_START,
};
pub use chain::{BlockIndexNode, ChainIndex, HeaderFields};
pub use chain_params::{ChainParams, ChainParamsConfig, ChainParamsError, Network};
pub use compact::{u256_max, CompactTarget, DecodedTarget};
pub use difficulty::{next_work_required, DifficultyCalculator};
pub use era::{Era, RetargetSchedule};
pub use error::{
    ConsensusError, ConsensusResult, InvariantViolation, TargetRangeError, ValidationFailure,
};
pub use lwma::lwma3_next_target;
pub use pow::{check_proof_of_work, Hash256};
pub use subsidy::{
    block_subsidy, day_of, Amount, BASE_SUBSIDY, BLOCKS_PER_DAY, BLOCKS_PER_YEAR, COIN,
    MIN_SUBSIDY, PREMINE,
};

/// Worldcoin network constants.
pub mod params {
    /// Chain id embedded in merge-mined block versions.
    pub const AUXPOW_CHAIN_ID: i32 = 0x205f;

    /// Mainnet height where merge-mining starts.
    pub const AUXPOW_START_HEIGHT: u32 = 6_569_805;

    /// Mainnet height where Digishield retargeting starts.
    pub const DIGISHIELD_START_HEIGHT: u32 = 6_601_666;

    /// Mainnet height where era-2 retargeting starts.
    pub const ERA2_START_HEIGHT: u32 = 600_000;

    /// Seconds between blocks before era 2.
    pub const LEGACY_TARGET_SPACING_SECS: i64 = 30;

    /// Seconds between blocks from era 2 on.
    pub const TARGET_SPACING_SECS: i64 = 60;

    /// LWMA-3 averaging window N.
    pub const LWMA_AVERAGING_WINDOW: u32 = 90;
}
