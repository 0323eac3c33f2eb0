//! # Ledger Configuration & Constants
//!
//! Protocol constants live at the top of this file. Below them is
//! [`LedgerConfig`], the JSON document a host loads at startup to describe
//! the token and its genesis allocation.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Crate version reported by hosts.
pub const LEDGER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Seconds in one vesting day. Periods are `duration_days * SECONDS_PER_DAY`.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Upper bound for `release_percent_per_period`.
pub const MAX_RELEASE_PERCENT: u8 = 100;

/// Decimal places used when a config does not name any.
pub const DEFAULT_DECIMALS: u8 = 18;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating a [`LedgerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid config document.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A genesis allocation targets the null address.
    #[error("genesis allocation to the null address")]
    NullGenesisAddress,

    /// The same address appears twice in the genesis list.
    #[error("duplicate genesis allocation for {0}")]
    DuplicateGenesis(Address),

    /// The sum of genesis allocations exceeds `u64::MAX`.
    #[error("genesis supply overflows u64")]
    SupplyOverflow,

    /// Token symbol is empty.
    #[error("token symbol must not be empty")]
    EmptySymbol,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Display metadata for the ledger's token. Arithmetic never uses
/// `decimals`; all amounts are integers in the smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Human-readable name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Decimal places for display.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "Vesting Devnet Token".into(),
            symbol: "VDT".into(),
            decimals: DEFAULT_DECIMALS,
        }
    }
}

/// Balance credited to an address when the ledger is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAllocation {
    /// Receiving account.
    pub address: Address,
    /// Initial balance in smallest units.
    pub amount: u64,
}

/// Startup configuration for a ledger instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Token metadata.
    #[serde(default)]
    pub token: TokenMetadata,
    /// Initial balances. Their sum is the initial total supply.
    #[serde(default)]
    pub genesis: Vec<GenesisAllocation>,
}

impl LedgerConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Parses and validates a JSON config document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the genesis list and metadata. Returns the genesis supply.
    pub fn validate(&self) -> Result<u64, ConfigError> {
        if self.token.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }

        let mut seen = HashSet::new();
        let mut supply: u64 = 0;
        for alloc in &self.genesis {
            if alloc.address.is_zero() {
                return Err(ConfigError::NullGenesisAddress);
            }
            if !seen.insert(alloc.address) {
                return Err(ConfigError::DuplicateGenesis(alloc.address));
            }
            supply = supply
                .checked_add(alloc.amount)
                .ok_or(ConfigError::SupplyOverflow)?;
        }
        Ok(supply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn alloc(n: u8, amount: u64) -> GenesisAllocation {
        GenesisAllocation {
            address: Address::from_low_u8(n),
            amount,
        }
    }

    #[test]
    fn default_config_is_valid_and_empty() {
        let config = LedgerConfig::default();
        assert_eq!(config.validate().unwrap(), 0);
        assert_eq!(config.token.decimals, DEFAULT_DECIMALS);
    }

    #[test]
    fn validate_sums_genesis_supply() {
        let config = LedgerConfig {
            token: TokenMetadata::default(),
            genesis: vec![alloc(1, 600), alloc(2, 400)],
        };
        assert_eq!(config.validate().unwrap(), 1_000);
    }

    #[test]
    fn validate_rejects_bad_genesis() {
        let null = LedgerConfig {
            genesis: vec![GenesisAllocation {
                address: Address::ZERO,
                amount: 1,
            }],
            ..Default::default()
        };
        assert!(matches!(null.validate(), Err(ConfigError::NullGenesisAddress)));

        let dup = LedgerConfig {
            genesis: vec![alloc(1, 1), alloc(1, 2)],
            ..Default::default()
        };
        assert!(matches!(dup.validate(), Err(ConfigError::DuplicateGenesis(_))));

        let overflow = LedgerConfig {
            genesis: vec![alloc(1, u64::MAX), alloc(2, 1)],
            ..Default::default()
        };
        assert!(matches!(overflow.validate(), Err(ConfigError::SupplyOverflow)));
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "token": {{ "name": "Team Token", "symbol": "TEAM" }},
                "genesis": [
                    {{ "address": "0x0000000000000000000000000000000000000001", "amount": 5000 }}
                ]
            }}"#
        )
        .unwrap();

        let config = LedgerConfig::load(file.path()).unwrap();
        assert_eq!(config.token.symbol, "TEAM");
        assert_eq!(config.token.decimals, DEFAULT_DECIMALS);
        assert_eq!(config.genesis, vec![alloc(1, 5000)]);
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            LedgerConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
