//! Proof-of-work check against a compact target.

use crate::chain_params::ChainParams;
use crate::compact::CompactTarget;
use crate::error::{TargetRangeError, ValidationFailure};
use num_bigint::BigUint;
use std::fmt;
use tracing::trace;

/// A 256-bit hash in internal (little-endian) byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The all-zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Interpret the hash as an unsigned 256-bit integer.
    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_le(&self.0)
    }

    /// Build a hash whose integer value is `value`, truncated to 256 bits.
    pub fn from_biguint(value: &BigUint) -> Self {
        let mut out = [0u8; 32];
        for (dst, src) in out.iter_mut().zip(value.to_bytes_le()) {
            *dst = src;
        }
        Self(out)
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self)
    }
}

impl fmt::Display for Hash256 {
    /// Big-endian hex, the way block hashes are usually displayed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter().rev() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Check that `hash` satisfies the target encoded in `bits`.
///
/// Fails with [`ValidationFailure::ProofOfWorkOutOfRange`] when the target is
/// negative, zero, overflowed or easier than `params.pow_limit`, and with
/// [`ValidationFailure::ProofOfWorkInsufficient`] when `hash > target`.
pub fn check_proof_of_work(
    hash: &Hash256,
    bits: CompactTarget,
    params: &ChainParams,
) -> Result<(), ValidationFailure> {
    let target = bits
        .to_target()
        .map_err(|reason| ValidationFailure::ProofOfWorkOutOfRange { bits, reason })?;

    if target > *params.pow_limit() {
        return Err(ValidationFailure::ProofOfWorkOutOfRange {
            bits,
            reason: TargetRangeError::AboveLimit,
        });
    }

    let hash_value = hash.to_biguint();
    if hash_value > target {
        trace!(%hash, %bits, "hash above target");
        return Err(ValidationFailure::ProofOfWorkInsufficient {
            hash: hash_value,
            target,
        });
    }

    Ok(())
}
