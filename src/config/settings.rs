use std::str::FromStr;
use std::time::Duration;

use ::config::{Config, Environment, File};
use alloy::primitives::{Address, U256};
use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;
use crate::utils::{parse_address, scale_amount, validate_decimals, MAX_TOKEN_DECIMALS};

const DEFAULT_AMOUNT_IN: &str = "1";

fn default_pool_size() -> usize {
    4
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

fn default_run_timeout_secs() -> u64 {
    120
}

/// How the valuation reads are tied to a block height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockPinning {
    /// Read the height first and issue every call at that height.
    #[default]
    Pinned,
    /// Call against the node's latest state, then read height and timestamp.
    /// The calls and the height query may straddle a block boundary.
    Latest,
}

impl FromStr for BlockPinning {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pinned" => Ok(BlockPinning::Pinned),
            "latest" => Ok(BlockPinning::Latest),
            other => Err(format!("expected `pinned` or `latest`, got `{other}`")),
        }
    }
}

/// Raw application settings as loaded from `config.{yaml,toml,json}` and the
/// environment.
///
/// Everything is optional at this layer so that an absent key is reported as
/// [`ConfigError::Missing`] by [`Settings::validate`] rather than as an opaque
/// deserialization failure. Environment variables (`RPC_URL`, `CHAIN_ID`, ...)
/// override file values.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub rpc_url: Option<String>,
    pub contract_address: Option<String>,
    pub chain_id: Option<String>,
    pub database_url: Option<String>,
    pub database_password: Option<String>,
    pub token0_address: Option<String>,
    pub token1_address: Option<String>,
    /// Decimals of token0, the amount-in token. Required: a wrong value shifts
    /// every stored valuation by orders of magnitude.
    pub token0_decimals: Option<String>,
    /// Human amount of token0 to value, defaults to one whole token.
    pub amount_in: Option<String>,
    pub block_pinning: Option<String>,
    pub pool_size: Option<String>,
    pub rpc_timeout_secs: Option<String>,
    pub run_timeout_secs: Option<String>,
    /// When set, the binary re-runs ingestion on this cadence instead of once.
    pub interval_secs: Option<String>,
}

/// Token pair being valued. Order matters and is passed verbatim to both
/// valuation calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token0: Address,
    pub token1: Address,
    pub token0_decimals: u8,
    /// `amount_in` scaled to token0's smallest unit.
    pub amount_in: U256,
}

/// Fully validated configuration for one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub rpc_url: Url,
    pub chain_id: u64,
    pub contract_address: Address,
    pub pair: TokenPair,
    pub database: tokio_postgres::Config,
    pub block_pinning: BlockPinning,
    pub pool_size: usize,
    pub rpc_timeout: Duration,
    pub run_timeout: Duration,
    pub interval: Option<Duration>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::default())
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }

    /// Check every setting without touching the network.
    pub fn validate(&self) -> Result<PipelineConfig, ConfigError> {
        let rpc_url = required("RPC_URL", &self.rpc_url)?;
        let contract_address = required("CONTRACT_ADDRESS", &self.contract_address)?;
        let chain_id = required("CHAIN_ID", &self.chain_id)?;
        let database_url = required("DATABASE_URL", &self.database_url)?;
        let database_password = required("DATABASE_PASSWORD", &self.database_password)?;
        let token0 = required("TOKEN0_ADDRESS", &self.token0_address)?;
        let token1 = required("TOKEN1_ADDRESS", &self.token1_address)?;
        let token0_decimals = required("TOKEN0_DECIMALS", &self.token0_decimals)?;

        let rpc_url = Url::parse(rpc_url).map_err(|e| ConfigError::malformed("RPC_URL", e))?;
        if !matches!(rpc_url.scheme(), "http" | "https") {
            return Err(ConfigError::malformed(
                "RPC_URL",
                format!("unsupported scheme {}", rpc_url.scheme()),
            ));
        }

        let contract_address = parse_address(contract_address)
            .map_err(|reason| ConfigError::malformed("CONTRACT_ADDRESS", reason))?;

        // Persisted as BIGINT
        let chain_id = chain_id
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                ConfigError::malformed("CHAIN_ID", format!("{chain_id} is not a positive integer"))
            })? as u64;

        let mut database = tokio_postgres::Config::from_str(database_url)
            .map_err(|e| ConfigError::malformed("DATABASE_URL", e))?;
        database.password(database_password);

        let token0 = parse_address(token0)
            .map_err(|reason| ConfigError::malformed("TOKEN0_ADDRESS", reason))?;
        let token1 = parse_address(token1)
            .map_err(|reason| ConfigError::malformed("TOKEN1_ADDRESS", reason))?;
        if token0 == token1 {
            return Err(ConfigError::malformed(
                "TOKEN1_ADDRESS",
                "token pair must name two different tokens",
            ));
        }

        let token0_decimals = token0_decimals
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(validate_decimals)
            .ok_or_else(|| {
                ConfigError::malformed(
                    "TOKEN0_DECIMALS",
                    format!("{token0_decimals} is not an integer in 0..={MAX_TOKEN_DECIMALS}"),
                )
            })?;

        let amount = optional(&self.amount_in).unwrap_or(DEFAULT_AMOUNT_IN);
        let amount_in = scale_amount(amount, token0_decimals)
            .map_err(|reason| ConfigError::malformed("AMOUNT_IN", reason))?;
        if amount_in.is_zero() {
            return Err(ConfigError::malformed(
                "AMOUNT_IN",
                "amount rounds to zero base units",
            ));
        }

        let block_pinning = match optional(&self.block_pinning) {
            Some(value) => value
                .parse()
                .map_err(|reason| ConfigError::malformed("BLOCK_PINNING", reason))?,
            None => BlockPinning::default(),
        };

        let pool_size = parse_positive("POOL_SIZE", &self.pool_size)?
            .map(|n| n as usize)
            .unwrap_or_else(default_pool_size);
        let rpc_timeout = Duration::from_secs(
            parse_positive("RPC_TIMEOUT_SECS", &self.rpc_timeout_secs)?
                .unwrap_or_else(default_rpc_timeout_secs),
        );
        let run_timeout = Duration::from_secs(
            parse_positive("RUN_TIMEOUT_SECS", &self.run_timeout_secs)?
                .unwrap_or_else(default_run_timeout_secs),
        );
        let interval =
            parse_positive("INTERVAL_SECS", &self.interval_secs)?.map(Duration::from_secs);

        Ok(PipelineConfig {
            rpc_url,
            chain_id,
            contract_address,
            pair: TokenPair {
                token0,
                token1,
                token0_decimals,
                amount_in,
            },
            database,
            block_pinning,
            pool_size,
            rpc_timeout,
            run_timeout,
            interval,
        })
    }
}

/// Blank values count as absent; an exported-but-empty variable is as good as missing.
fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(key: &'static str, value: &'a Option<String>) -> Result<&'a str, ConfigError> {
    optional(value).ok_or(ConfigError::Missing(key))
}

fn parse_positive(key: &'static str, value: &Option<String>) -> Result<Option<u64>, ConfigError> {
    optional(value)
        .map(|raw| {
            raw.parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::malformed(key, format!("{raw} is not a positive integer")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::example_settings;

    #[test]
    fn test_example_settings_validate() {
        let config = example_settings().validate().unwrap();
        assert_eq!(config.chain_id, 8453);
        assert_eq!(config.pair.token0_decimals, 8);
        assert_eq!(config.pair.amount_in, U256::from(100_000_000u64));
        assert_eq!(config.block_pinning, BlockPinning::Pinned);
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.run_timeout, Duration::from_secs(120));
        assert!(config.interval.is_none());
        assert_eq!(config.database.get_dbname(), Some("postgres"));
    }

    #[test]
    fn test_missing_rpc_url() {
        let settings = Settings {
            rpc_url: None,
            ..example_settings()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Missing("RPC_URL"))
        ));
    }

    #[test]
    fn test_blank_value_is_missing() {
        let settings = Settings {
            database_password: Some("   ".to_string()),
            ..example_settings()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Missing("DATABASE_PASSWORD"))
        ));
    }

    #[test]
    fn test_token_decimals_are_required() {
        let settings = Settings {
            token0_decimals: None,
            ..example_settings()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Missing("TOKEN0_DECIMALS"))
        ));
    }

    #[test]
    fn test_malformed_values() {
        let cases = [
            (
                Settings {
                    contract_address: Some("0x1234".to_string()),
                    ..example_settings()
                },
                "CONTRACT_ADDRESS",
            ),
            (
                Settings {
                    chain_id: Some("base".to_string()),
                    ..example_settings()
                },
                "CHAIN_ID",
            ),
            (
                Settings {
                    rpc_url: Some("ws://localhost:8546".to_string()),
                    ..example_settings()
                },
                "RPC_URL",
            ),
            (
                Settings {
                    token0_decimals: Some("30".to_string()),
                    ..example_settings()
                },
                "TOKEN0_DECIMALS",
            ),
            (
                Settings {
                    amount_in: Some("0".to_string()),
                    ..example_settings()
                },
                "AMOUNT_IN",
            ),
            (
                Settings {
                    block_pinning: Some("finalized".to_string()),
                    ..example_settings()
                },
                "BLOCK_PINNING",
            ),
            (
                Settings {
                    interval_secs: Some("0".to_string()),
                    ..example_settings()
                },
                "INTERVAL_SECS",
            ),
        ];

        for (settings, expected_key) in cases {
            match settings.validate() {
                Err(ConfigError::Malformed { key, .. }) => assert_eq!(key, expected_key),
                other => panic!("expected malformed {expected_key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_amount_beyond_token_precision_rejected() {
        let settings = Settings {
            amount_in: Some("1.000000009".to_string()),
            ..example_settings()
        };
        match settings.validate() {
            Err(ConfigError::Malformed { key, reason }) => {
                assert_eq!(key, "AMOUNT_IN");
                assert!(reason.contains("more than 8 decimal places"), "{reason}");
            },
            other => panic!("expected malformed AMOUNT_IN, got {other:?}"),
        }
    }

    #[test]
    fn test_identical_tokens_rejected() {
        let settings = Settings {
            token1_address: example_settings().token0_address,
            ..example_settings()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Malformed {
                key: "TOKEN1_ADDRESS",
                ..
            })
        ));
    }

    #[test]
    fn test_optional_overrides() {
        let settings = Settings {
            amount_in: Some("2.5".to_string()),
            block_pinning: Some("Latest".to_string()),
            interval_secs: Some("300".to_string()),
            ..example_settings()
        };
        let config = settings.validate().unwrap();
        assert_eq!(config.pair.amount_in, U256::from(250_000_000u64));
        assert_eq!(config.block_pinning, BlockPinning::Latest);
        assert_eq!(config.interval, Some(Duration::from_secs(300)));
    }
}
