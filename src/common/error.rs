//! Error types for the scenario runner
//!
//! Messages are meant to be read by whoever is running the scenario, with a
//! hint on how to fix the most common problem (no node listening).

use ethers::types::H256;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the scenario runner
#[derive(Error, Debug)]
pub enum Error {
    // === Pre-flight Errors ===
    #[error("Cannot connect to the node ({0}). Please run `anvil --odyssey`")]
    UnreachableNode(String),

    // === Scenario Errors ===
    #[error("Invalid scenario: {0}")]
    Configuration(String),

    #[error("Step '{tag}' failed: {source}")]
    StepExecution {
        tag: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Step '{tag}' produced no {expected}")]
    MissingOutput { tag: String, expected: String },

    #[error("Unknown account or contract '{0}'")]
    UnknownAccount(String),

    #[error("Contract '{contract}' has no function named '{function}'")]
    UnknownFunction { contract: String, function: String },

    // === RPC Errors ===
    #[error("RPC transport error calling {method}: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("RPC method {method} failed ({code}): {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Timed out after {secs} seconds waiting for receipt of {hash:?}")]
    ReceiptTimeout { hash: H256, secs: u64 },

    #[error("Transaction {0:?} reverted")]
    Reverted(H256),

    // === Signing Errors ===
    #[error("Signing failed: {0}")]
    Signing(String),

    // === Configuration File Errors ===
    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a step failure with the tag of the step that raised it
    pub fn step_failed(tag: &str, source: Error) -> Self {
        Self::StepExecution {
            tag: tag.to_string(),
            source: Box::new(source),
        }
    }

    /// Create a missing output error
    pub fn missing_output(tag: &str, expected: &str) -> Self {
        Self::MissingOutput {
            tag: tag.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Create an unknown function error
    pub fn unknown_function(contract: &str, function: &str) -> Self {
        Self::UnknownFunction {
            contract: contract.to_string(),
            function: function.to_string(),
        }
    }
}

impl From<ethers::signers::WalletError> for Error {
    fn from(e: ethers::signers::WalletError) -> Self {
        Error::Signing(e.to_string())
    }
}
