//! Difficulty retargeting.
//!
//! [`DifficultyCalculator::next_work_required`] picks the rule set for the
//! candidate height and hands off to either the classic calculator
//! (legacy / era-2 / auxpow / Digishield) or LWMA-3.

use crate::auxpow::BlockHeader;
use crate::chain::{BlockIndexNode, ChainIndex};
use crate::chain_params::ChainParams;
use crate::compact::{bit_length, mul_u64_wrapping, wrap_u256, CompactTarget};
use crate::era::{Era, RetargetSchedule};
use crate::error::InvariantViolation;
use crate::lwma;
use num_bigint::BigUint;
use tracing::{debug, instrument};

/// Retarget calculator bound to one network's parameters.
#[derive(Debug, Clone, Copy)]
pub struct DifficultyCalculator<'a> {
    params: &'a ChainParams,
}

impl<'a> DifficultyCalculator<'a> {
    /// Create a new calculator with the given chain parameters.
    pub fn new(params: &'a ChainParams) -> Self {
        Self { params }
    }

    /// Compact target the block following `tip` must satisfy.
    ///
    /// # Arguments
    /// * `chain` - Index `tip` belongs to; ancestry down to genesis must be complete
    /// * `tip` - Current chain tip, `None` when validating genesis
    /// * `candidate_time` - Timestamp of the candidate header
    ///
    /// # Errors
    /// [`InvariantViolation`] when the index is missing an ancestor. The caller
    /// must not treat this as an invalid block.
    #[instrument(level = "debug", skip(self, chain, tip))]
    pub fn next_work_required<C: ChainIndex>(
        &self,
        chain: &C,
        tip: Option<&C::Node>,
        candidate_time: i64,
    ) -> Result<CompactTarget, InvariantViolation> {
        let params = self.params;
        let pow_limit_bits = CompactTarget::encode(params.pow_limit());

        // Genesis block
        let tip = match tip {
            Some(tip) => tip,
            None => return Ok(pow_limit_bits),
        };

        if self.allow_min_difficulty_for_block(tip, candidate_time) {
            debug!(tip_height = tip.height(), "minimum difficulty block after long gap");
            return Ok(pow_limit_bits);
        }

        let height = next_height(tip);
        let era = Era::at(height, params);
        let RetargetSchedule { spacing, interval } = era.schedule(params);

        // Only change once per difficulty adjustment interval
        if i64::from(height) % interval != 0 {
            if params.allow_min_difficulty_blocks {
                if candidate_time > tip.time() + spacing * 2 {
                    return Ok(pow_limit_bits);
                }
                return Ok(last_non_min_difficulty_bits(chain, tip, params, pow_limit_bits));
            }
            return Ok(tip.bits());
        }

        // Go back the full period unless it's the first retarget after genesis.
        let blocks_back = if i64::from(height) == interval {
            interval - 1
        } else {
            interval
        };

        let first_height = i64::from(tip.height()) - blocks_back;
        if first_height < 0 {
            return Err(InvariantViolation::NegativeHeight {
                tip_height: tip.height(),
                blocks_back: u32::try_from(blocks_back).unwrap_or(u32::MAX),
            });
        }
        let first_height = first_height as u32;
        let first = chain
            .ancestor(tip, first_height)
            .ok_or(InvariantViolation::MissingAncestor {
                height: first_height,
                tip_height: tip.height(),
            })?;

        let bits = if era == Era::Lwma {
            lwma::lwma3_next_target(chain, tip, params)?
        } else {
            self.calculate_classic_target(tip, first.time())
        };

        debug!(
            height,
            %era,
            old_bits = %tip.bits(),
            new_bits = %bits,
            "retarget"
        );

        Ok(bits)
    }

    /// [`next_work_required`](Self::next_work_required) for a candidate
    /// header, using its timestamp.
    pub fn next_work_required_for_header<C: ChainIndex, H: BlockHeader + ?Sized>(
        &self,
        chain: &C,
        tip: Option<&C::Node>,
        candidate: &H,
    ) -> Result<CompactTarget, InvariantViolation> {
        self.next_work_required(chain, tip, candidate.time())
    }

    /// Testnet escape valve once every block is a retarget point.
    ///
    /// True when minimum difficulty blocks are allowed, the candidate is in
    /// the Digishield era or later, and it arrives more than two legacy
    /// spacings after `tip`.
    pub fn allow_min_difficulty_for_block<N: BlockIndexNode + ?Sized>(
        &self,
        tip: &N,
        candidate_time: i64,
    ) -> bool {
        let params = self.params;
        if !params.allow_min_difficulty_blocks {
            return false;
        }
        if next_height(tip) < params.height_digishield {
            return false;
        }
        candidate_time > tip.time() + params.pow_target_spacing * 2
    }

    /// Classic retarget from the tip's target and the window's elapsed time.
    ///
    /// `first_block_time` is the timestamp at the start of the retarget window.
    pub fn calculate_classic_target<N: BlockIndexNode + ?Sized>(
        &self,
        tip: &N,
        first_block_time: i64,
    ) -> CompactTarget {
        let params = self.params;
        if params.no_retargeting {
            return tip.bits();
        }

        let era = Era::at(next_height(tip), params);
        let actual_timespan = tip.time() - first_block_time;
        let pow_limit = params.pow_limit();
        let old_target = tip.bits().decode().value;

        let (timespan, adjusted) = match era {
            Era::Digishield | Era::Lwma => {
                return digishield_target(&old_target, actual_timespan, params);
            }
            Era::AuxPow => {
                let t = params.target_timespan_era2;
                (t, clamp_timespan(actual_timespan, t / 16, t * 16))
            }
            Era::Era2 => {
                let t = params.target_timespan_era2;
                (t, clamp_timespan(actual_timespan, t - t / 10, t + t / 10))
            }
            Era::Legacy => {
                let t = params.pow_target_timespan;
                (t, clamp_timespan(actual_timespan, t / 4, t * 4))
            }
        };

        // Intermediate product can overflow 256 bits by one bit.
        let shift = bit_length(&old_target) > bit_length(pow_limit).saturating_sub(1);
        let mut new_target = if shift { old_target >> 1usize } else { old_target };
        new_target = mul_u64_wrapping(&new_target, as_multiplier(adjusted)) / as_multiplier(timespan);
        if shift {
            new_target = wrap_u256(new_target << 1usize);
        }

        if new_target > *pow_limit {
            new_target = pow_limit.clone();
        }

        CompactTarget::encode(&new_target)
    }
}

/// Digishield: damp the deviation to one eighth, clamp to [-25%, +50%] of
/// the timespan, then scale.
fn digishield_target(
    old_target: &BigUint,
    actual_timespan: i64,
    params: &ChainParams,
) -> CompactTarget {
    let timespan = params.digishield_target_timespan;
    let modulated = timespan + (actual_timespan - timespan) / 8;
    let modulated = clamp_timespan(modulated, timespan - timespan / 4, timespan + timespan / 2);

    let mut new_target =
        mul_u64_wrapping(old_target, as_multiplier(modulated)) / as_multiplier(timespan);
    if new_target > *params.pow_limit() {
        new_target = params.pow_limit().clone();
    }

    CompactTarget::encode(&new_target)
}

/// Return the last non-special-min-difficulty-rules-block.
fn last_non_min_difficulty_bits<C: ChainIndex>(
    chain: &C,
    tip: &C::Node,
    params: &ChainParams,
    pow_limit_bits: CompactTarget,
) -> CompactTarget {
    let legacy_interval = params.difficulty_adjustment_interval();
    let mut node = tip;
    while let Some(prev) = chain.predecessor(node) {
        if i64::from(node.height()) % legacy_interval == 0 || node.bits() != pow_limit_bits {
            break;
        }
        node = prev;
    }
    node.bits()
}

fn next_height<N: BlockIndexNode + ?Sized>(tip: &N) -> u32 {
    tip.height().saturating_add(1)
}

fn clamp_timespan(value: i64, min: i64, max: i64) -> i64 {
    let mut value = value;
    if value < min {
        value = min;
    }
    if value > max {
        value = max;
    }
    value
}

fn as_multiplier(timespan: i64) -> u64 {
    u64::try_from(timespan).unwrap_or(0)
}

/// Calculate the required target for the block after `tip`.
///
/// Convenience wrapper creating a [`DifficultyCalculator`].
pub fn next_work_required<C: ChainIndex>(
    chain: &C,
    tip: Option<&C::Node>,
    candidate_time: i64,
    params: &ChainParams,
) -> Result<CompactTarget, InvariantViolation> {
    DifficultyCalculator::new(params).next_work_required(chain, tip, candidate_time)
}
