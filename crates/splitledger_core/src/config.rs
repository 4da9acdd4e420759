//! Application configuration.
//!
//! # Responsibility
//! - Describe logging, storage, and bridge timing knobs in one document.
//! - Load that document from JSON with per-field defaults.
//!
//! # Invariants
//! - Every field is optional in the JSON; missing fields take defaults.
//! - Timer periods are validated to be non-zero before use.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

/// Chain id of Ethereum mainnet.
pub const ETHEREUM_CHAIN_ID: u64 = 1;
/// Chain id of the Sepolia testnet.
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read config: {err}"),
            Self::Parse(err) => write!(f, "cannot parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Network the wallet SDK is configured for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    /// Destination chain preselected in the bridge form.
    pub fn default_chain_id(self) -> u64 {
        match self {
            Self::Mainnet => ETHEREUM_CHAIN_ID,
            Self::Testnet => SEPOLIA_CHAIN_ID,
        }
    }
}

/// Timing and default-input knobs for the bridge panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub network: Network,
    /// Input inactivity before an automatic quote.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Period of background quote refreshes while a quote is held.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Resolution of the execution elapsed-time counter.
    #[serde(default = "default_elapsed_tick_ms")]
    pub elapsed_tick_ms: u64,
    #[serde(default = "default_token")]
    pub default_token: String,
}

fn default_debounce_ms() -> u64 {
    800
}

fn default_refresh_interval_ms() -> u64 {
    5_000
}

fn default_elapsed_tick_ms() -> u64 {
    100
}

fn default_token() -> String {
    "USDC".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            debounce_ms: default_debounce_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
            elapsed_tick_ms: default_elapsed_tick_ms(),
            default_token: default_token(),
        }
    }
}

impl BridgeConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn elapsed_tick(&self) -> Duration {
        Duration::from_millis(self.elapsed_tick_ms)
    }

    /// Rejects zero periods and a blank default token.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "bridge.refresh_interval_ms must be > 0".to_string(),
            ));
        }
        if self.elapsed_tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "bridge.elapsed_tick_ms must be > 0".to_string(),
            ));
        }
        if self.default_token.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "bridge.default_token cannot be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files; logging stays off when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
    /// SQLite file holding the ledger; in-memory when unset.
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl AppConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.bridge.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}
