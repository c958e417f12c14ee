//! Compact ("nBits") encoding of 256-bit targets.
//!
//! nBits format: `0x[size][word]`
//! - size: 1 byte, the byte length of the target
//! - word: 3 bytes, the most significant bytes of the target; bit 23 is a sign bit
//!
//! Arithmetic on decoded targets behaves like a fixed 256-bit unsigned
//! integer: products and left shifts wrap modulo 2^256.

use crate::error::TargetRangeError;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::fmt;

/// Sign bit of the 24-bit mantissa.
const SIGN_BIT: u32 = 0x0080_0000;

/// Mantissa bits without the sign.
const MANTISSA_MASK: u32 = 0x007f_ffff;

/// A target in its 32-bit compact form, as stored in block headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CompactTarget(u32);

/// Result of decoding a compact target, flags included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTarget {
    /// Decoded value, truncated to 256 bits.
    pub value: BigUint,
    /// Sign bit set on a non-zero mantissa.
    pub is_negative: bool,
    /// Mantissa does not fit in 256 bits at this exponent.
    pub is_overflow: bool,
}

impl CompactTarget {
    /// Wrap a raw nBits value.
    pub const fn from_consensus(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw nBits value.
    pub const fn to_consensus(self) -> u32 {
        self.0
    }

    /// Decode into a 256-bit value plus the negative/overflow flags.
    ///
    /// Flags are reported, never acted upon: a negative encoding still
    /// yields the magnitude of its mantissa so that retargeting from a
    /// stored header reproduces historical results.
    pub fn decode(self) -> DecodedTarget {
        let size = self.0 >> 24;
        let mut word = self.0 & MANTISSA_MASK;

        let value = if size <= 3 {
            word >>= 8 * (3 - size);
            BigUint::from(word)
        } else {
            wrap_u256(BigUint::from(word) << (8 * (size - 3)) as usize)
        };

        let is_negative = word != 0 && (self.0 & SIGN_BIT) != 0;
        let is_overflow = word != 0
            && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));

        DecodedTarget {
            value,
            is_negative,
            is_overflow,
        }
    }

    /// Decode and reject negative, zero and overflowed encodings.
    pub fn to_target(self) -> Result<BigUint, TargetRangeError> {
        let decoded = self.decode();
        if decoded.is_negative {
            return Err(TargetRangeError::Negative);
        }
        if decoded.is_overflow {
            return Err(TargetRangeError::Overflow);
        }
        if decoded.value.is_zero() {
            return Err(TargetRangeError::Zero);
        }
        Ok(decoded.value)
    }

    /// Encode a 256-bit value using the minimal exponent.
    ///
    /// Values wider than 256 bits are truncated first.
    pub fn encode(value: &BigUint) -> Self {
        let value = wrap_u256(value.clone());
        let mut size = ((value.bits() + 7) / 8) as u32;

        let mut compact = if size <= 3 {
            (low_u64(&value) << (8 * (3 - size))) as u32
        } else {
            low_u64(&(value >> (8 * (size - 3)) as usize)) as u32
        };

        // Keep the encoding positive.
        if compact & SIGN_BIT != 0 {
            compact >>= 8;
            size += 1;
        }

        Self(compact | (size << 24))
    }
}

impl From<u32> for CompactTarget {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl From<CompactTarget> for u32 {
    fn from(bits: CompactTarget) -> Self {
        bits.0
    }
}

impl fmt::Display for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl fmt::LowerHex for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// 2^256 - 1.
pub fn u256_max() -> BigUint {
    (BigUint::one() << 256usize) - BigUint::one()
}

/// Reduce modulo 2^256.
pub(crate) fn wrap_u256(value: BigUint) -> BigUint {
    if value.bits() > 256 {
        value & u256_max()
    } else {
        value
    }
}

/// `value * factor` with 256-bit wraparound.
pub(crate) fn mul_u64_wrapping(value: &BigUint, factor: u64) -> BigUint {
    wrap_u256(value * factor)
}

/// Number of significant bits, 0 for zero.
pub(crate) fn bit_length(value: &BigUint) -> u64 {
    value.bits()
}

fn low_u64(value: &BigUint) -> u64 {
    value.iter_u64_digits().next().unwrap_or(0)
}
