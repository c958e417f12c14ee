//! Height-gated retargeting eras.
//!
//! Every rule that depends on "which difficulty algorithm was active at this
//! height" goes through [`Era::at`], so the dispatcher and the calculators
//! can never disagree about the era of a block.

use crate::chain_params::ChainParams;
use std::fmt;

/// Retargeting era, ordered by activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Era {
    /// Bitcoin-style retarget over the legacy window, clamped to 4x.
    Legacy,
    /// Shorter era-2 window clamped to +-10%.
    Era2,
    /// Merge-mining era: era-2 window clamped to 16x.
    AuxPow,
    /// Per-block retarget with amplitude filter.
    Digishield,
    /// Linearly weighted moving average over N blocks.
    Lwma,
}

/// Spacing and retarget interval in force for an era.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetargetSchedule {
    /// Intended seconds between blocks.
    pub spacing: i64,
    /// Blocks between retarget points.
    pub interval: i64,
}

impl Era {
    /// All eras, oldest first.
    pub const ALL: [Era; 5] = [Era::Legacy, Era::Era2, Era::AuxPow, Era::Digishield, Era::Lwma];

    /// The era in force at `height`: the latest one whose activation is `<= height`.
    pub fn at(height: u32, params: &ChainParams) -> Era {
        Era::ALL
            .iter()
            .rev()
            .copied()
            .find(|era| era.activation_height(params).map_or(false, |h| height >= h))
            .unwrap_or(Era::Legacy)
    }

    /// Activation height, `None` for the genesis era.
    pub fn activation_height(self, params: &ChainParams) -> Option<u32> {
        match self {
            Era::Legacy => None,
            Era::Era2 => Some(params.height_era2),
            Era::AuxPow => Some(params.height_auxpow),
            Era::Digishield => Some(params.height_digishield),
            Era::Lwma => Some(params.height_lwma),
        }
    }

    /// Spacing and interval used for retarget-point gating.
    ///
    /// Digishield and auxpow blocks keep the era-2 schedule; Digishield still
    /// retargets on every block through its own calculator.
    pub fn schedule(self, params: &ChainParams) -> RetargetSchedule {
        match self {
            Era::Lwma => RetargetSchedule {
                spacing: params.lwma_target_timespan,
                interval: 1,
            },
            Era::Era2 | Era::AuxPow | Era::Digishield => RetargetSchedule {
                spacing: params.target_spacing_era2,
                interval: params.difficulty_adjustment_interval_era2(),
            },
            Era::Legacy => RetargetSchedule {
                spacing: params.pow_target_spacing,
                interval: params.difficulty_adjustment_interval(),
            },
        }
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Era::Legacy => "legacy",
            Era::Era2 => "era2",
            Era::AuxPow => "auxpow",
            Era::Digishield => "digishield",
            Era::Lwma => "lwma3",
        };
        f.write_str(s)
    }
}
