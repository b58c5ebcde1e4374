//! Exchange configuration
//!
//! Defaults, then an optional JSON file named by `EXCHANGE_CONFIG`, then
//! `EXCHANGE_*` environment overrides.

use std::path::{Path, PathBuf};

use blockchain::{ChainConfig, MAX_DIFFICULTY};
use market_data::CandleConfig;
use market_maker::PricingConfig;
use matching_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use stop_monitor::StopMonitorConfig;
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "EXCHANGE_CONFIG";
const OVERRIDE_PREFIX: &str = "EXCHANGE_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value {value:?} for {key}")]
    InvalidOverride { key: String, value: String },
}

/// Periods of the scheduled tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub volatility_tick_secs: u64,
    pub liquidity_refresh_secs: u64,
    pub mining_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            volatility_tick_secs: 300,
            liquidity_refresh_secs: 3_600,
            mining_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub engine: EngineConfig,
    pub pricing: PricingConfig,
    pub stops: StopMonitorConfig,
    pub chain: ChainConfig,
    pub candles: CandleConfig,
    pub schedule: ScheduleConfig,
    /// Buffered events per coin channel
    pub broadcast_capacity: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            pricing: PricingConfig::default(),
            stops: StopMonitorConfig::default(),
            chain: ChainConfig::default(),
            candles: CandleConfig::default(),
            schedule: ScheduleConfig::default(),
            broadcast_capacity: 1_024,
        }
    }
}

impl ExchangeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        base.with_overrides(std::env::vars())
    }

    /// Apply `EXCHANGE_*` overrides; unknown keys are ignored
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(OVERRIDE_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();
            match name {
                "PRICING_SEED" => self.pricing.seed = parse(key.as_ref(), value)?,
                "STOP_POLL_MS" => self.stops.poll_interval_ms = parse(key.as_ref(), value)?,
                "CHAIN_DIFFICULTY" => {
                    let difficulty: u32 = parse(key.as_ref(), value)?;
                    if difficulty > MAX_DIFFICULTY {
                        return Err(ConfigError::InvalidOverride {
                            key: key.as_ref().to_string(),
                            value: value.to_string(),
                        });
                    }
                    self.chain.difficulty = difficulty;
                }
                "CHAIN_MAX_TRANSACTIONS" => self.chain.max_transactions_per_block = parse(key.as_ref(), value)?,
                "CHAIN_BLOCK_REWARD" => self.chain.block_reward = parse(key.as_ref(), value)?,
                "CHAIN_MINER" => self.chain.default_miner = value.to_string(),
                "VOLATILITY_TICK_SECS" => self.schedule.volatility_tick_secs = parse(key.as_ref(), value)?,
                "LIQUIDITY_REFRESH_SECS" => self.schedule.liquidity_refresh_secs = parse(key.as_ref(), value)?,
                "MINING_INTERVAL_SECS" => self.schedule.mining_interval_secs = parse(key.as_ref(), value)?,
                "BROADCAST_CAPACITY" => self.broadcast_capacity = parse(key.as_ref(), value)?,
                _ => {}
            }
        }
        Ok(self)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_defaults() {
        let config = ExchangeConfig::default();
        assert_eq!(config.schedule.volatility_tick_secs, 300);
        assert_eq!(config.schedule.liquidity_refresh_secs, 3_600);
        assert_eq!(config.stops.poll_interval_ms, 1_000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ExchangeConfig =
            serde_json::from_str(r#"{"chain": {"difficulty": 1}, "schedule": {"mining_interval_secs": 5}}"#).unwrap();
        assert_eq!(config.chain.difficulty, 1);
        assert_eq!(config.chain.max_transactions_per_block, 100);
        assert_eq!(config.schedule.mining_interval_secs, 5);
        assert_eq!(config.schedule.volatility_tick_secs, 300);
    }

    #[test]
    fn test_env_overrides() {
        let config = ExchangeConfig::default()
            .with_overrides([
                ("EXCHANGE_CHAIN_DIFFICULTY", "2"),
                ("EXCHANGE_CHAIN_MINER", "node-7"),
                ("EXCHANGE_CHAIN_BLOCK_REWARD", "12.5"),
                ("EXCHANGE_PRICING_SEED", "9"),
                ("EXCHANGE_UNKNOWN", "x"),
                ("PATH", "/usr/bin"),
            ])
            .unwrap();
        assert_eq!(config.chain.difficulty, 2);
        assert_eq!(config.chain.default_miner, "node-7");
        assert_eq!(config.chain.block_reward, Decimal::new(125, 1));
        assert_eq!(config.pricing.seed, 9);
    }

    #[test]
    fn test_bad_override_rejected() {
        let result = ExchangeConfig::default().with_overrides([("EXCHANGE_STOP_POLL_MS", "soon")]);
        assert!(matches!(result, Err(ConfigError::InvalidOverride { .. })));
    }

    #[test]
    fn test_unmineable_difficulty_override_rejected() {
        let result = ExchangeConfig::default().with_overrides([("EXCHANGE_CHAIN_DIFFICULTY", "65")]);
        assert!(matches!(result, Err(ConfigError::InvalidOverride { .. })));
        let config = ExchangeConfig::default()
            .with_overrides([("EXCHANGE_CHAIN_DIFFICULTY", "64")])
            .unwrap();
        assert_eq!(config.chain.difficulty, 64);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = ExchangeConfig::from_file("/nonexistent/exchange.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/exchange.json"));
    }
}
