use crate::core::{BalancePolicy, MAX_DIFFICULTY, MINING_DIFFICULTY};
use crate::error::{BlockchainError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

static DEFAULT_NODE_ADDR: &str = "127.0.0.1:5000";

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const MINING_DIFFICULTY_KEY: &str = "MINING_DIFFICULTY";
const BALANCE_POLICY_KEY: &str = "BALANCE_POLICY";

/// Node settings: built-in defaults, then an optional TOML file, then
/// environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node_addr: String,
    pub mining_difficulty: usize,
    pub balance_policy: BalancePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            node_addr: String::from(DEFAULT_NODE_ADDR),
            mining_difficulty: MINING_DIFFICULTY,
            balance_policy: BalancePolicy::default(),
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied.
    pub fn new() -> Result<Config> {
        let mut config = Config::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file, then applies environment overrides.
    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&text)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup` (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(NODE_ADDRESS_KEY) {
            self.node_addr = addr;
        }
        if let Some(difficulty) = lookup(MINING_DIFFICULTY_KEY) {
            self.mining_difficulty = difficulty.trim().parse().map_err(|e| {
                BlockchainError::Config(format!("Invalid {MINING_DIFFICULTY_KEY}: {e}"))
            })?;
        }
        if let Some(policy) = lookup(BALANCE_POLICY_KEY) {
            self.balance_policy = policy.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.mining_difficulty > MAX_DIFFICULTY {
            return Err(BlockchainError::Config(format!(
                "mining_difficulty must be at most {MAX_DIFFICULTY}, got {}",
                self.mining_difficulty
            )));
        }
        self.port().map(|_| ())
    }

    /// Extract the port from the node address (e.g., "127.0.0.1:5000" -> 5000)
    pub fn port(&self) -> Result<u16> {
        self.node_addr
            .rsplit(':')
            .next()
            .and_then(|port| port.parse().ok())
            .ok_or_else(|| {
                BlockchainError::Config(format!(
                    "Node address has no valid port: {}",
                    self.node_addr
                ))
            })
    }

    pub fn with_port(&self, port: u16) -> Config {
        let host = match self.node_addr.rsplit_once(':') {
            Some((host, _)) => host,
            None => self.node_addr.as_str(),
        };
        Config {
            node_addr: format!("{host}:{port}"),
            ..self.clone()
        }
    }
}
