//! LWMA-3 difficulty algorithm.
//!
//! Linearly weighted moving average over the last N solvetimes; the most
//! recent block carries weight N, the oldest weight 1. Each solvetime is
//! capped at 6T and timestamps are forced to increase by at least one second.

use crate::chain::{BlockIndexNode, ChainIndex};
use crate::chain_params::ChainParams;
use crate::compact::{mul_u64_wrapping, wrap_u256, CompactTarget};
use crate::error::InvariantViolation;
use num_bigint::BigUint;
use num_traits::Zero;
use tracing::trace;

/// Next target under LWMA-3 for the block following `tip`.
///
/// Returns the pow limit while the chain is shorter than the averaging
/// window. The window is walked through predecessors, so every block from
/// `tip.height - N` to `tip` must be indexed.
pub fn lwma3_next_target<C: ChainIndex>(
    chain: &C,
    tip: &C::Node,
    params: &ChainParams,
) -> Result<CompactTarget, InvariantViolation> {
    let n = params.lwma_averaging_window;
    let t = params.lwma_target_timespan;
    let height = tip.height();

    if height < n {
        return Ok(CompactTarget::encode(params.pow_limit()));
    }

    let window = collect_window(chain, tip, n)?;

    // k = N*(N+1)*T/2, targets are pre-divided by k*N to keep the sum small
    let window_len = BigUint::from(n);
    let k = &window_len * (&window_len + 1u32) * as_factor(t) / 2u32;
    let divisor = &k * &window_len;
    let max_solvetime = t.saturating_mul(6);

    let mut previous_timestamp = window[0].time();
    let mut weighted_solvetimes = BigUint::zero();
    let mut sum_target = BigUint::zero();

    for (j, node) in (1u64..).zip(window[1..].iter()) {
        let this_timestamp = node.time().max(previous_timestamp.saturating_add(1));
        let solvetime = max_solvetime.min(this_timestamp - previous_timestamp);
        previous_timestamp = this_timestamp;

        weighted_solvetimes += BigUint::from(as_factor(solvetime)) * j;
        sum_target += node.bits().decode().value / &divisor;

        trace!(height = node.height(), solvetime, weight = j, "lwma sample");
    }

    let previous_diff = tip.bits().decode().value;
    let mut next_target = wrap_u256(sum_target * weighted_solvetimes);

    let lower = mul_u64_wrapping(&previous_diff, 67) / 100u32;
    let upper = mul_u64_wrapping(&previous_diff, 150) / 100u32;
    if next_target < lower {
        next_target = lower;
    }
    if next_target > upper {
        next_target = upper;
    }
    if next_target > *params.pow_limit() {
        next_target = params.pow_limit().clone();
    }

    Ok(CompactTarget::encode(&next_target))
}

/// Nodes from `tip.height - n` up to `tip`, oldest first.
fn collect_window<'a, C: ChainIndex>(
    chain: &'a C,
    tip: &'a C::Node,
    n: u32,
) -> Result<Vec<&'a C::Node>, InvariantViolation> {
    let mut window = Vec::with_capacity(n as usize + 1);
    let mut node = tip;
    window.push(node);
    for _ in 0..n {
        node = chain
            .predecessor(node)
            .ok_or(InvariantViolation::MissingAncestor {
                height: node.height().saturating_sub(1),
                tip_height: tip.height(),
            })?;
        window.push(node);
    }
    window.reverse();
    Ok(window)
}

fn as_factor(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
