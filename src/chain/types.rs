//! Value types exchanged with a chain client

use ethers::types::{Address, Bytes, H256, U256, U64};
use serde::{Deserialize, Serialize};

use super::contract::ContractArtifact;

/// Leading bytes of an EIP-7702 delegation designator (`0xef0100 || address`)
pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

/// A chain address with a human-readable label
///
/// The label only exists for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub label: String,
    pub address: Address,
}

impl Account {
    pub fn new(label: impl Into<String>, address: Address) -> Self {
        Self {
            label: label.into(),
            address,
        }
    }
}

/// A signed EIP-7702 authorization tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedAuthorization {
    /// Account that signed the authorization and will carry the delegation
    pub authority: Address,
    pub chain_id: u64,
    /// Contract the authority delegates to
    pub address: Address,
    pub nonce: u64,
    pub y_parity: u8,
    pub r: U256,
    pub s: U256,
}

/// Parameters of a plain transaction
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    /// Recipient, `None` creates a contract
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    /// Non-empty turns the transaction into an EIP-7702 set-code transaction
    pub authorization_list: Vec<SignedAuthorization>,
}

impl TransactionRequest {
    /// A value transfer
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to: Some(to),
            value,
            ..Default::default()
        }
    }

    pub fn with_authorizations(mut self, authorizations: Vec<SignedAuthorization>) -> Self {
        self.authorization_list = authorizations;
        self
    }
}

/// Call of a zero-argument contract function
#[derive(Debug, Clone)]
pub struct ContractCall {
    pub address: Address,
    pub artifact: &'static ContractArtifact,
    pub function: String,
    pub value: U256,
    pub authorization_list: Vec<SignedAuthorization>,
}

impl ContractCall {
    pub fn new(address: Address, artifact: &'static ContractArtifact, function: &str) -> Self {
        Self {
            address,
            artifact,
            function: function.to_string(),
            value: U256::zero(),
            authorization_list: Vec::new(),
        }
    }

    pub fn with_authorizations(mut self, authorizations: Vec<SignedAuthorization>) -> Self {
        self.authorization_list = authorizations;
        self
    }
}

/// Subset of `eth_getTransactionReceipt` the scenarios look at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: H256,
    #[serde(default)]
    pub block_number: Option<U64>,
    /// 1 on success, 0 on revert
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub gas_used: Option<U256>,
    #[serde(default, rename = "type")]
    pub transaction_type: Option<U64>,
}

impl Receipt {
    /// Pre-Byzantium receipts have no status; treat them as successful
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |status| !status.is_zero())
    }
}

/// Address an EOA delegates to, if `code` is a delegation designator
pub fn delegation_target(code: &[u8]) -> Option<Address> {
    if code.len() == DELEGATION_PREFIX.len() + 20 && code.starts_with(&DELEGATION_PREFIX) {
        Some(Address::from_slice(&code[DELEGATION_PREFIX.len()..]))
    } else {
        None
    }
}

/// Build the code an EOA carries after delegating to `target`
pub fn delegation_code(target: Address) -> Bytes {
    let mut code = DELEGATION_PREFIX.to_vec();
    code.extend_from_slice(target.as_bytes());
    code.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegation_designator_round_trip() {
        let target: Address = "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap();
        let code = delegation_code(target);
        assert_eq!(code.len(), 23);
        assert_eq!(&code[..3], &[0xef, 0x01, 0x00]);
        assert_eq!(delegation_target(&code), Some(target));
    }

    #[test]
    fn test_plain_code_is_not_a_designator() {
        assert_eq!(delegation_target(&[]), None);
        assert_eq!(delegation_target(&[0x60, 0x00, 0x35]), None);
        // right prefix, wrong length
        assert_eq!(delegation_target(&[0xef, 0x01, 0x00, 0x01]), None);
    }

    #[test]
    fn test_receipt_from_anvil_json() {
        let json = serde_json::json!({
            "transactionHash": "0x4e3a3754410177e6937ef1f84bba68ea139e8d1a2258c5f85db9f1cd715a1bdd",
            "blockNumber": "0x3",
            "status": "0x1",
            "contractAddress": null,
            "gasUsed": "0xb44e",
            "type": "0x4",
            "logs": []
        });
        let receipt: Receipt = serde_json::from_value(json).unwrap();
        assert!(receipt.succeeded());
        assert_eq!(receipt.transaction_type, Some(U64::from(4)));
        assert_eq!(receipt.gas_used, Some(U256::from(0xb44e)));
        assert_eq!(receipt.contract_address, None);
    }

    #[test]
    fn test_reverted_receipt() {
        let json = serde_json::json!({
            "transactionHash": "0x4e3a3754410177e6937ef1f84bba68ea139e8d1a2258c5f85db9f1cd715a1bdd",
            "status": "0x0"
        });
        let receipt: Receipt = serde_json::from_value(json).unwrap();
        assert!(!receipt.succeeded());
    }
}
