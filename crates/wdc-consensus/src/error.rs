//! Error types for consensus validation.
//!
//! Two families are kept apart:
//! - [`ValidationFailure`]: the candidate header is invalid. Reject the block.
//! - [`InvariantViolation`]: the chain index broke a precondition (missing
//!   ancestor, negative window start). Validation must stop; the result of
//!   continuing would diverge from the rest of the network.

use crate::compact::CompactTarget;
use num_bigint::BigUint;
use std::fmt;
use thiserror::Error;

/// Why a compact target was rejected before any hash comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRangeError {
    /// Sign bit set on a non-zero mantissa.
    Negative,
    /// Decodes to zero.
    Zero,
    /// Mantissa and exponent need more than 256 bits.
    Overflow,
    /// Decodes to a target easier than the network limit.
    AboveLimit,
}

impl fmt::Display for TargetRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetRangeError::Negative => "negative",
            TargetRangeError::Zero => "zero",
            TargetRangeError::Overflow => "overflow",
            TargetRangeError::AboveLimit => "above pow limit",
        };
        f.write_str(s)
    }
}

/// A header failed proof-of-work or merge-mining validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// Non merge-mined header carries an auxpow payload anyway.
    #[error("legacy block with auxpow properties")]
    LegacyBlockWithAuxpow,

    /// Merge-mined header without its auxpow payload.
    #[error("auxpow block without auxpow properties")]
    AuxpowBlockMissingAuxpow,

    /// Chain id embedded in the version does not match the network.
    #[error("block does not have our chain ID (got {got}, expected {expected}, version {version:#x})")]
    WrongChainId { got: i32, expected: i32, version: i32 },

    /// The auxpow merkle proof or parent linkage failed its own check.
    #[error("auxpow is not valid")]
    InvalidAuxpowProof,

    /// The parent chain block does not meet this chain's target.
    #[error("auxpow proof of work failed: {source}")]
    ParentProofOfWorkInsufficient {
        #[source]
        source: Box<ValidationFailure>,
    },

    /// Compact target is negative, zero, overflowed or above the limit.
    #[error("proof of work target out of range ({reason}) for bits {bits}")]
    ProofOfWorkOutOfRange {
        bits: CompactTarget,
        reason: TargetRangeError,
    },

    /// Hash is above the decoded target.
    #[error("hash {hash:#x} does not meet target {target:#x}")]
    ProofOfWorkInsufficient { hash: BigUint, target: BigUint },
}

/// The chain index did not honour the preconditions of retargeting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// An ancestor that must exist for a complete chain was not found.
    #[error("missing ancestor at height {height} below tip {tip_height}")]
    MissingAncestor { height: u32, tip_height: u32 },

    /// The retarget window would start below genesis.
    #[error("retarget window of {blocks_back} blocks reaches below genesis from tip {tip_height}")]
    NegativeHeight { tip_height: u32, blocks_back: u32 },
}

/// Umbrella error for callers that drive both retargeting and validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// The block is invalid.
    #[error("block validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// The chain index is corrupt or incomplete. Not recoverable.
    #[error("consensus invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl ConsensusError {
    /// Whether the caller must stop instead of rejecting a block.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConsensusError::Invariant(_))
    }
}

/// Result type for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
