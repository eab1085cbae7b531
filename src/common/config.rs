//! Configuration file handling
//!
//! Every setting has a default matching a stock `anvil --odyssey` node, so the
//! scenarios run without any configuration file at all.

use std::path::Path;

use ethers::types::U256;
use ethers::utils::parse_ether;
use serde::Deserialize;

use super::{Error, Result};

/// Default JSON-RPC endpoint of a local anvil node
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Anvil dev account #0, pre-funded on every fresh node
pub const DEFAULT_DEPLOYER_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Node connection settings
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Deployer identity and funding
    #[serde(default)]
    pub accounts: AccountsConfig,

    /// Gas and fee settings for submitted transactions
    #[serde(default)]
    pub transactions: TransactionConfig,

    /// Receipt polling
    #[serde(default)]
    pub receipts: ReceiptConfig,
}

/// Node connection settings
#[derive(Debug, Deserialize, Clone)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Timeout for a single JSON-RPC request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}
fn default_request_timeout() -> u64 {
    10
}

/// Deployer identity and funding
#[derive(Debug, Deserialize, Clone)]
pub struct AccountsConfig {
    /// Private key of the pre-funded account that deploys and funds
    #[serde(default = "default_deployer_key")]
    pub deployer_key: String,

    /// Ether each tracked account receives before the scenario starts;
    /// also the amount of `fund` steps that do not name a value
    #[serde(default = "default_funding_ether")]
    pub funding_ether: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            deployer_key: default_deployer_key(),
            funding_ether: default_funding_ether(),
        }
    }
}

impl AccountsConfig {
    /// `funding_ether` in wei
    pub fn funding_wei(&self) -> Result<U256> {
        parse_ether(self.funding_ether.trim()).map_err(|e| {
            Error::ConfigParse(format!(
                "accounts.funding_ether '{}': {}",
                self.funding_ether, e
            ))
        })
    }
}

fn default_deployer_key() -> String {
    DEFAULT_DEPLOYER_KEY.to_string()
}
fn default_funding_ether() -> String {
    "1".to_string()
}

/// Gas and fee settings
#[derive(Debug, Deserialize, Clone)]
pub struct TransactionConfig {
    /// Gas limit used for every transaction
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,

    /// Max priority fee per gas, in gwei
    #[serde(default = "default_priority_fee")]
    pub max_priority_fee_gwei: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            gas_limit: default_gas_limit(),
            max_priority_fee_gwei: default_priority_fee(),
        }
    }
}

fn default_gas_limit() -> u64 {
    1_000_000
}
fn default_priority_fee() -> u64 {
    1
}

/// Receipt polling settings
#[derive(Debug, Deserialize, Clone)]
pub struct ReceiptConfig {
    /// Delay between `eth_getTransactionReceipt` polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Give up waiting for a receipt after this long
    #[serde(default = "default_receipt_timeout")]
    pub timeout_secs: u64,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            timeout_secs: default_receipt_timeout(),
        }
    }
}

fn default_poll_interval() -> u64 {
    100
}
fn default_receipt_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from `path`
    ///
    /// Returns the default configuration when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}
