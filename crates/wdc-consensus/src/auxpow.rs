//! Merge-mined (auxpow) proof-of-work verification.
//!
//! A merge-mined header proves its work through a parent chain block. The
//! merkle linkage between the two chains is checked by the payload itself
//! through [`AuxPowProof::validate`]; this module only orders the checks and
//! applies this chain's target to the parent block hash.

use crate::chain_params::ChainParams;
use crate::compact::CompactTarget;
use crate::error::ValidationFailure;
use crate::pow::{check_proof_of_work, Hash256};
use std::fmt;
use tracing::debug;

/// Bit flagging a merge-mined block version.
pub const VERSION_AUXPOW: i32 = 1 << 8;

/// First bit of the chain id inside the version.
pub const VERSION_CHAIN_START: u32 = 16;

/// Block header version with merge-mining flags.
///
/// Layout: chain id in the upper 16 bits, the auxpow flag at bit 8 and the
/// base version in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockVersion(i32);

impl BlockVersion {
    /// Wrap a raw header version.
    pub const fn from_consensus(version: i32) -> Self {
        Self(version)
    }

    /// Build a version from its parts.
    pub const fn new(base_version: i32, chain_id: i32, merge_mined: bool) -> Self {
        let mut version = (base_version % VERSION_AUXPOW) | (chain_id << VERSION_CHAIN_START);
        if merge_mined {
            version |= VERSION_AUXPOW;
        }
        Self(version)
    }

    /// Raw header version.
    pub const fn to_consensus(self) -> i32 {
        self.0
    }

    /// Chain id embedded in the upper bits.
    pub const fn chain_id(self) -> i32 {
        self.0 >> VERSION_CHAIN_START
    }

    /// Version without chain id and auxpow flag.
    pub const fn base_version(self) -> i32 {
        self.0 % VERSION_AUXPOW
    }

    /// Whether the auxpow flag is set.
    pub const fn is_merge_mined(self) -> bool {
        self.0 & VERSION_AUXPOW != 0
    }

    /// Version 1 headers predate merge-mining and never carry a chain id.
    pub const fn is_legacy(self) -> bool {
        self.0 == 1
    }
}

impl From<i32> for BlockVersion {
    fn from(version: i32) -> Self {
        Self(version)
    }
}

impl fmt::Display for BlockVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Auxpow payload attached to a merge-mined header.
pub trait AuxPowProof {
    /// Check the merkle proof and parent linkage for a block with
    /// `identity_hash` on the chain `chain_id`.
    fn validate(&self, identity_hash: &Hash256, chain_id: i32, params: &ChainParams) -> bool;

    /// Proof-of-work hash of the parent chain block.
    fn parent_pow_hash(&self) -> Hash256;
}

/// The header fields merge-mining validation reads.
pub trait BlockHeader {
    /// Attached auxpow payload type.
    type AuxPow: AuxPowProof;

    /// Header version.
    fn version(&self) -> BlockVersion;

    /// Compact target the header claims.
    fn bits(&self) -> CompactTarget;

    /// Header timestamp in Unix seconds.
    fn time(&self) -> i64;

    /// Hash compared against the target for non merge-mined headers.
    fn pow_hash(&self) -> Hash256;

    /// Block identity hash committed to by the parent chain.
    fn identity_hash(&self) -> Hash256;

    /// Auxpow payload, if any.
    fn auxpow(&self) -> Option<&Self::AuxPow>;

    fn chain_id(&self) -> i32 {
        self.version().chain_id()
    }

    fn is_legacy(&self) -> bool {
        self.version().is_legacy()
    }

    fn is_merge_mined(&self) -> bool {
        self.version().is_merge_mined()
    }
}

/// Check the proof of work of `header`, merge-mined or not.
///
/// Legacy and non merge-mined headers are checked directly against their own
/// pow hash. Merge-mined headers must carry an auxpow payload, the right chain
/// id when `params.strict_chain_id` is set, a valid payload, and a parent
/// block hash meeting `header.bits()`.
pub fn check_merge_mined_proof_of_work<H: BlockHeader + ?Sized>(
    header: &H,
    params: &ChainParams,
) -> Result<(), ValidationFailure> {
    let version = header.version();

    if header.is_legacy() || !header.is_merge_mined() {
        if header.auxpow().is_some() {
            return Err(rejected(ValidationFailure::LegacyBlockWithAuxpow, version));
        }
        return check_proof_of_work(&header.pow_hash(), header.bits(), params);
    }

    let auxpow = header
        .auxpow()
        .ok_or_else(|| rejected(ValidationFailure::AuxpowBlockMissingAuxpow, version))?;

    let chain_id = header.chain_id();
    if params.strict_chain_id && chain_id != params.auxpow_chain_id {
        return Err(rejected(
            ValidationFailure::WrongChainId {
                got: chain_id,
                expected: params.auxpow_chain_id,
                version: version.to_consensus(),
            },
            version,
        ));
    }

    if !auxpow.validate(&header.identity_hash(), chain_id, params) {
        return Err(rejected(ValidationFailure::InvalidAuxpowProof, version));
    }

    check_proof_of_work(&auxpow.parent_pow_hash(), header.bits(), params).map_err(|source| {
        rejected(
            ValidationFailure::ParentProofOfWorkInsufficient {
                source: Box::new(source),
            },
            version,
        )
    })
}

fn rejected(failure: ValidationFailure, version: BlockVersion) -> ValidationFailure {
    debug!(%version, reason = %failure, "merge-mined header rejected");
    failure
}
