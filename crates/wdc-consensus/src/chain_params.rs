//! Network consensus parameters.
//!
//! Built once at startup from the selected network and shared read-only.
//! - `ChainParams::mainnet()`, `testnet()`, `regtest()` for the built-in networks
//! - `ChainParams::from_config()` / `from_toml_str()` for private networks

use crate::compact::u256_max;
use crate::params::{
    AUXPOW_CHAIN_ID, AUXPOW_START_HEIGHT, DIGISHIELD_START_HEIGHT, ERA2_START_HEIGHT,
    LEGACY_TARGET_SPACING_SECS, LWMA_AVERAGING_WINDOW, TARGET_SPACING_SECS,
};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Network selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    /// Production network.
    Mainnet,
    /// Public test network with minimum-difficulty blocks.
    Testnet,
    /// Local regression testing, fixed difficulty.
    Regtest,
}

impl FromStr for Network {
    type Err = ChainParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Mainnet),
            "test" | "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(ChainParamsError {
                field: "network",
                message: format!("unknown network '{}'", other),
            }),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        };
        f.write_str(s)
    }
}

/// Error when constructing ChainParams from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParamsError {
    /// The field that is missing or invalid.
    pub field: &'static str,
    /// Description of the error.
    pub message: String,
}

impl fmt::Display for ChainParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainParams error for '{}': {}", self.field, self.message)
    }
}

impl std::error::Error for ChainParamsError {}

/// Configuration for loading ChainParams from TOML.
///
/// All fields are optional so partial configs can be validated with clear errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainParamsConfig {
    /// Easiest allowed target as hex (big-endian).
    pub pow_limit_hex: Option<String>,
    /// Legacy seconds between blocks.
    pub pow_target_spacing: Option<i64>,
    /// Era-2 seconds between blocks.
    pub target_spacing_era2: Option<i64>,
    /// Legacy retarget window in seconds.
    pub pow_target_timespan: Option<i64>,
    /// Digishield retarget timespan in seconds.
    pub digishield_target_timespan: Option<i64>,
    /// Era-2 retarget window in seconds.
    pub target_timespan_era2: Option<i64>,
    /// LWMA-3 target solvetime in seconds.
    pub lwma_target_timespan: Option<i64>,
    /// LWMA-3 averaging window N.
    pub lwma_averaging_window: Option<u32>,
    /// Era-2 activation height.
    pub height_era2: Option<u32>,
    /// Digishield activation height.
    pub height_digishield: Option<u32>,
    /// Merge-mining activation height.
    pub height_auxpow: Option<u32>,
    /// LWMA-3 activation height.
    pub height_lwma: Option<u32>,
    /// Testnet-style minimum difficulty blocks.
    pub allow_min_difficulty_blocks: Option<bool>,
    /// Regtest-style fixed difficulty.
    pub no_retargeting: Option<bool>,
    /// Enforce the merge-mining chain id.
    pub strict_chain_id: Option<bool>,
    /// Expected merge-mining chain id.
    pub auxpow_chain_id: Option<i32>,
}

/// Network-specific consensus parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParams {
    /// Network these parameters were built for, `None` for custom configs.
    pub network: Option<Network>,

    /// Easiest allowed target.
    pow_limit: BigUint,

    /// Legacy seconds between blocks.
    pub pow_target_spacing: i64,
    /// Era-2 (and later) seconds between blocks.
    pub target_spacing_era2: i64,

    /// Legacy retarget window in seconds.
    pub pow_target_timespan: i64,
    /// Digishield retarget timespan; every block retargets.
    pub digishield_target_timespan: i64,
    /// Era-2 and auxpow retarget window in seconds.
    pub target_timespan_era2: i64,
    /// LWMA-3 target solvetime (T).
    pub lwma_target_timespan: i64,
    /// LWMA-3 averaging window (N).
    pub lwma_averaging_window: u32,

    /// Era activation heights, non-decreasing in this order:
    /// era2 <= auxpow <= digishield <= lwma.
    pub height_era2: u32,
    pub height_auxpow: u32,
    pub height_digishield: u32,
    pub height_lwma: u32,

    /// Testnet rule: blocks after a long gap may use the pow limit.
    pub allow_min_difficulty_blocks: bool,
    /// Regtest rule: difficulty never changes.
    pub no_retargeting: bool,
    /// Reject merge-mined blocks carrying a foreign chain id.
    pub strict_chain_id: bool,
    /// Chain id expected in merge-mined block versions.
    pub auxpow_chain_id: i32,
}

impl ChainParams {
    /// Mainnet parameters.
    ///
    /// LWMA-3 is not scheduled on mainnet; its height is left at `u32::MAX`.
    pub fn mainnet() -> Self {
        Self {
            network: Some(Network::Mainnet),
            pow_limit: u256_max() >> 20usize,
            pow_target_spacing: LEGACY_TARGET_SPACING_SECS,
            target_spacing_era2: TARGET_SPACING_SECS,
            pow_target_timespan: 302_400, // 3.5 days
            digishield_target_timespan: TARGET_SPACING_SECS,
            target_timespan_era2: TARGET_SPACING_SECS,
            lwma_target_timespan: TARGET_SPACING_SECS,
            lwma_averaging_window: LWMA_AVERAGING_WINDOW,
            height_era2: ERA2_START_HEIGHT,
            height_auxpow: AUXPOW_START_HEIGHT,
            height_digishield: DIGISHIELD_START_HEIGHT,
            height_lwma: u32::MAX,
            allow_min_difficulty_blocks: false,
            no_retargeting: false,
            strict_chain_id: true,
            auxpow_chain_id: AUXPOW_CHAIN_ID,
        }
    }

    /// Testnet parameters: every era activates early.
    pub fn testnet() -> Self {
        Self {
            network: Some(Network::Testnet),
            allow_min_difficulty_blocks: true,
            height_era2: 100,
            height_auxpow: 200,
            height_digishield: 300,
            height_lwma: 400,
            ..Self::mainnet()
        }
    }

    /// Regtest parameters: fixed difficulty at the easiest target.
    pub fn regtest() -> Self {
        Self {
            network: Some(Network::Regtest),
            pow_limit: u256_max() >> 1usize,
            allow_min_difficulty_blocks: true,
            no_retargeting: true,
            strict_chain_id: false,
            height_era2: 0,
            height_auxpow: 0,
            height_digishield: 0,
            height_lwma: u32::MAX,
            ..Self::mainnet()
        }
    }

    /// Parameters for a built-in network.
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::mainnet(),
            Network::Testnet => Self::testnet(),
            Network::Regtest => Self::regtest(),
        }
    }

    /// Parse a TOML document into a validated `ChainParams`.
    pub fn from_toml_str(content: &str) -> Result<Self, ChainParamsError> {
        let config: ChainParamsConfig = toml::from_str(content).map_err(|e| ChainParamsError {
            field: "toml",
            message: e.to_string(),
        })?;
        Self::from_config(&config)
    }

    /// Create ChainParams from configuration.
    ///
    /// Returns an error naming the specific field if any required field is missing or invalid.
    /// Flags default to `false`.
    pub fn from_config(config: &ChainParamsConfig) -> Result<Self, ChainParamsError> {
        let pow_limit_hex = config.pow_limit_hex.as_ref().ok_or_else(|| missing("pow_limit_hex"))?;

        // Hex hygiene: trim whitespace and strip optional 0x prefix
        let hex_cleaned = pow_limit_hex.trim();
        let hex_cleaned = hex_cleaned
            .strip_prefix("0x")
            .or_else(|| hex_cleaned.strip_prefix("0X"))
            .unwrap_or(hex_cleaned);

        let pow_limit =
            BigUint::parse_bytes(hex_cleaned.as_bytes(), 16).ok_or_else(|| ChainParamsError {
                field: "pow_limit_hex",
                message: format!("invalid hex string: '{}'", pow_limit_hex),
            })?;

        if pow_limit.is_zero() {
            return Err(ChainParamsError {
                field: "pow_limit_hex",
                message: "pow limit cannot be zero".to_string(),
            });
        }
        if pow_limit.bits() > 256 {
            return Err(ChainParamsError {
                field: "pow_limit_hex",
                message: format!("pow limit is {} bits wide, max 256", pow_limit.bits()),
            });
        }

        let params = Self {
            network: None,
            pow_limit,
            pow_target_spacing: positive("pow_target_spacing", config.pow_target_spacing)?,
            target_spacing_era2: positive("target_spacing_era2", config.target_spacing_era2)?,
            pow_target_timespan: positive("pow_target_timespan", config.pow_target_timespan)?,
            digishield_target_timespan: positive(
                "digishield_target_timespan",
                config.digishield_target_timespan,
            )?,
            target_timespan_era2: positive("target_timespan_era2", config.target_timespan_era2)?,
            lwma_target_timespan: positive("lwma_target_timespan", config.lwma_target_timespan)?,
            lwma_averaging_window: match config.lwma_averaging_window {
                None => return Err(missing("lwma_averaging_window")),
                Some(0) => {
                    return Err(ChainParamsError {
                        field: "lwma_averaging_window",
                        message: "must be greater than zero".to_string(),
                    })
                }
                Some(n) => n,
            },
            height_era2: config.height_era2.ok_or_else(|| missing("height_era2"))?,
            height_auxpow: config.height_auxpow.ok_or_else(|| missing("height_auxpow"))?,
            height_digishield: config
                .height_digishield
                .ok_or_else(|| missing("height_digishield"))?,
            height_lwma: config.height_lwma.ok_or_else(|| missing("height_lwma"))?,
            allow_min_difficulty_blocks: config.allow_min_difficulty_blocks.unwrap_or(false),
            no_retargeting: config.no_retargeting.unwrap_or(false),
            strict_chain_id: config.strict_chain_id.unwrap_or(false),
            auxpow_chain_id: config.auxpow_chain_id.ok_or_else(|| missing("auxpow_chain_id"))?,
        };

        if params.pow_target_timespan < params.pow_target_spacing {
            return Err(ChainParamsError {
                field: "pow_target_timespan",
                message: "shorter than pow_target_spacing".to_string(),
            });
        }
        if params.target_timespan_era2 < params.target_spacing_era2 {
            return Err(ChainParamsError {
                field: "target_timespan_era2",
                message: "shorter than target_spacing_era2".to_string(),
            });
        }

        let ordered = [
            ("height_auxpow", params.height_era2, params.height_auxpow),
            ("height_digishield", params.height_auxpow, params.height_digishield),
            ("height_lwma", params.height_digishield, params.height_lwma),
        ];
        for (field, previous, height) in ordered {
            if height < previous {
                return Err(ChainParamsError {
                    field,
                    message: format!("activates at {} before the preceding era at {}", height, previous),
                });
            }
        }

        Ok(params)
    }

    /// Same parameters with the four era activation heights replaced.
    ///
    /// Heights are taken as given; use [`ChainParams::from_config`] when
    /// they need validating.
    pub fn with_era_heights(mut self, era2: u32, auxpow: u32, digishield: u32, lwma: u32) -> Self {
        self.height_era2 = era2;
        self.height_auxpow = auxpow;
        self.height_digishield = digishield;
        self.height_lwma = lwma;
        self
    }

    /// Easiest allowed target.
    pub fn pow_limit(&self) -> &BigUint {
        &self.pow_limit
    }

    /// Blocks per legacy retarget window.
    pub fn difficulty_adjustment_interval(&self) -> i64 {
        self.pow_target_timespan / self.pow_target_spacing
    }

    /// Blocks per era-2 retarget window.
    pub fn difficulty_adjustment_interval_era2(&self) -> i64 {
        self.target_timespan_era2 / self.target_spacing_era2
    }
}

fn missing(field: &'static str) -> ChainParamsError {
    ChainParamsError {
        field,
        message: "required field missing".to_string(),
    }
}

fn positive(field: &'static str, value: Option<i64>) -> Result<i64, ChainParamsError> {
    match value {
        None => Err(missing(field)),
        Some(v) if v <= 0 => Err(ChainParamsError {
            field,
            message: format!("must be greater than zero, got {}", v),
        }),
        Some(v) => Ok(v),
    }
}
