//! Block subsidy schedule.
//!
//! The base reward follows a yearly sine wave, is multiplied on bonus days
//! and halves every year, with a floor of one coin.

use std::f64::consts::PI;

/// Amount in base units.
pub type Amount = i64;

/// Base units in one coin.
pub const COIN: Amount = 100_000_000;

/// Smallest subsidy ever paid.
pub const MIN_SUBSIDY: Amount = COIN;

/// One-time payout of block 1.
pub const PREMINE: Amount = 270_000_000 * COIN;

/// Base payout before seasonal and bonus adjustments.
pub const BASE_SUBSIDY: Amount = 10_000 * COIN;

/// Blocks in one seasonal cycle and one halving epoch.
pub const BLOCKS_PER_YEAR: u32 = 525_600;

/// Blocks per subsidy day.
pub const BLOCKS_PER_DAY: u32 = 1_440;

/// Subsidy for the block at `height`.
pub fn block_subsidy(height: u32) -> Amount {
    if height == 1 {
        return PREMINE;
    }

    let phase = f64::from(height % BLOCKS_PER_YEAR) / f64::from(BLOCKS_PER_YEAR) * 2.0 * PI;
    // truncates toward zero
    let seasonal = (2000.0 * phase.sin()) as i64;
    let mut subsidy = BASE_SUBSIDY + seasonal * COIN;

    let day = day_of(height);
    subsidy *= regular_bonus(day) * special_bonus(day);

    let epochs = height / BLOCKS_PER_YEAR;
    subsidy = subsidy.checked_shr(epochs).unwrap_or(0);

    subsidy.max(MIN_SUBSIDY)
}

/// Days since launch, starting at 1.
pub fn day_of(height: u32) -> u32 {
    height / BLOCKS_PER_DAY + 1
}

// Every 31st day pays 5x, otherwise every 14th day pays 2x.
fn regular_bonus(day: u32) -> Amount {
    if day % 31 == 0 {
        5
    } else if day % 14 == 0 {
        2
    } else {
        1
    }
}

// Launch days, stacked on top of the regular bonus.
fn special_bonus(day: u32) -> Amount {
    match day {
        1 => 5,
        2 => 3,
        3 => 2,
        _ => 1,
    }
}
