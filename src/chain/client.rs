//! JSON-RPC chain client holding local keys
//!
//! Transactions are signed locally and submitted with `eth_sendRawTransaction`,
//! so the node never needs to know the scenario accounts.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, H256, U256, U64};
use ethers::utils::parse_units;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::common::config::{Config, ReceiptConfig, TransactionConfig};
use crate::common::{Error, Result};

use super::codec::{self, UnsignedTransaction};
use super::contract::ContractArtifact;
use super::rpc::RpcTransport;
use super::types::{Account, ContractCall, Receipt, SignedAuthorization, TransactionRequest};
use super::ChainClient;

/// Base fee assumed when the latest block does not report one
const FALLBACK_BASE_FEE_WEI: u64 = 1_000_000_000;

/// Chain client for a JSON-RPC node
pub struct RpcChainClient {
    transport: RpcTransport,
    deployer: LocalWallet,
    /// Keys of accounts created through [`ChainClient::create_account`]
    wallets: RwLock<HashMap<Address, LocalWallet>>,
    transactions: TransactionConfig,
    receipts: ReceiptConfig,
}

impl RpcChainClient {
    /// Build a client from configuration
    ///
    /// Does not touch the network; reachability is checked by the first call.
    pub fn new(config: &Config) -> Result<Self> {
        let deployer: LocalWallet = config
            .accounts
            .deployer_key
            .parse()
            .map_err(|e| Error::Configuration(format!("Invalid deployer key: {}", e)))?;

        let transport = RpcTransport::new(
            &config.rpc.url,
            Duration::from_secs(config.rpc.request_timeout_secs),
        )?;

        Ok(Self {
            transport,
            deployer,
            wallets: RwLock::new(HashMap::new()),
            transactions: config.transactions.clone(),
            receipts: config.receipts.clone(),
        })
    }

    async fn wallet(&self, address: Address) -> Result<LocalWallet> {
        if address == self.deployer.address() {
            return Ok(self.deployer.clone());
        }
        self.wallets
            .read()
            .await
            .get(&address)
            .cloned()
            .ok_or_else(|| Error::UnknownAccount(format!("{:?}", address)))
    }

    async fn nonce(&self, address: Address) -> Result<u64> {
        let nonce: U64 = self
            .transport
            .request("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        Ok(nonce.as_u64())
    }

    async fn base_fee(&self) -> Result<U256> {
        let block: Value = self
            .transport
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await?;

        match block.get("baseFeePerGas") {
            Some(fee) if !fee.is_null() => Ok(serde_json::from_value(fee.clone())?),
            _ => Ok(U256::from(FALLBACK_BASE_FEE_WEI)),
        }
    }

    /// Sign and submit a transaction from `from`
    async fn submit(
        &self,
        from: Address,
        to: Option<Address>,
        value: U256,
        data: Bytes,
        authorization_list: Vec<SignedAuthorization>,
    ) -> Result<H256> {
        let wallet = self.wallet(from).await?;

        let max_priority_fee_per_gas: U256 =
            parse_units(self.transactions.max_priority_fee_gwei, "gwei")
                .map_err(|e| Error::Configuration(format!("Invalid priority fee: {}", e)))?
                .into();
        let base_fee = self.base_fee().await?;

        let tx = UnsignedTransaction {
            chain_id: self.chain_id().await?,
            nonce: self.nonce(from).await?,
            max_priority_fee_per_gas,
            max_fee_per_gas: base_fee * U256::from(2u64) + max_priority_fee_per_gas,
            gas_limit: self.transactions.gas_limit,
            to,
            value,
            data,
            authorization_list,
        };

        let raw = tx.sign(&wallet)?;
        let hash: H256 = self
            .transport
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(&raw))]),
            )
            .await?;

        tracing::info!(
            tx_type = tx.tx_type(),
            from = ?from,
            to = ?to,
            nonce = tx.nonce,
            authorizations = tx.authorization_list.len(),
            "Submitted transaction {:?}",
            hash
        );
        Ok(hash)
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn endpoint(&self) -> String {
        self.transport.url().to_string()
    }

    fn deployer(&self) -> Address {
        self.deployer.address()
    }

    async fn chain_id(&self) -> Result<u64> {
        let id: U64 = self.transport.request("eth_chainId", json!([])).await?;
        Ok(id.as_u64())
    }

    async fn get_code(&self, address: Address) -> Result<Bytes> {
        self.transport
            .request("eth_getCode", json!([address, "latest"]))
            .await
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        self.transport
            .request("eth_getBalance", json!([address, "latest"]))
            .await
    }

    async fn create_account(&self, label: &str) -> Result<Account> {
        let wallet = LocalWallet::new(&mut rand::thread_rng());
        let address = wallet.address();
        self.wallets.write().await.insert(address, wallet);

        tracing::debug!("Created account {} at {:?}", label, address);
        Ok(Account::new(label, address))
    }

    async fn deploy_contract(&self, from: Address, artifact: &ContractArtifact) -> Result<H256> {
        let code = artifact.creation_code()?;
        self.submit(from, None, U256::zero(), code, Vec::new()).await
    }

    async fn wait_for_receipt(&self, hash: H256) -> Result<Receipt> {
        let deadline = Instant::now() + Duration::from_secs(self.receipts.timeout_secs);
        let interval = Duration::from_millis(self.receipts.poll_interval_ms);

        loop {
            let receipt: Option<Receipt> = self
                .transport
                .request("eth_getTransactionReceipt", json!([hash]))
                .await?;

            if let Some(receipt) = receipt {
                return Ok(receipt);
            }

            if Instant::now() >= deadline {
                return Err(Error::ReceiptTimeout {
                    hash,
                    secs: self.receipts.timeout_secs,
                });
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn sign_authorization(
        &self,
        authority: Address,
        contract: Address,
        delegate: bool,
    ) -> Result<SignedAuthorization> {
        let wallet = self.wallet(authority).await?;
        let chain_id = self.chain_id().await?;
        let current = self.nonce(authority).await?;
        let nonce = if delegate { current } else { current + 1 };

        codec::sign_authorization(&wallet, chain_id, contract, nonce)
    }

    async fn send_transaction(&self, from: Address, request: TransactionRequest) -> Result<H256> {
        self.submit(
            from,
            request.to,
            request.value,
            request.data,
            request.authorization_list,
        )
        .await
    }

    async fn write_contract(&self, from: Address, call: ContractCall) -> Result<H256> {
        let data = call.artifact.encode_call(&call.function)?;
        self.submit(
            from,
            Some(call.address),
            call.value,
            data,
            call.authorization_list,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_created_accounts_can_sign() {
        let client = RpcChainClient::new(&Config::default()).unwrap();
        let alice = client.create_account("Alice").await.unwrap();
        let bob = client.create_account("Bob").await.unwrap();

        assert_eq!(alice.label, "Alice");
        assert_ne!(alice.address, bob.address);
        assert_eq!(client.wallet(alice.address).await.unwrap().address(), alice.address);
        assert_eq!(client.wallet(client.deployer()).await.unwrap().address(), client.deployer());
    }

    #[tokio::test]
    async fn test_unknown_sender_is_rejected() {
        let client = RpcChainClient::new(&Config::default()).unwrap();
        let err = client.wallet(Address::repeat_byte(0x42)).await.unwrap_err();
        assert!(matches!(err, Error::UnknownAccount(_)));
    }

    #[test]
    fn test_invalid_deployer_key() {
        let mut config = Config::default();
        config.accounts.deployer_key = "0x1234".to_string();
        assert!(matches!(
            RpcChainClient::new(&config),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_endpoint_comes_from_config() {
        let mut config = Config::default();
        config.rpc.url = "http://127.0.0.1:9545".to_string();
        let client = RpcChainClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9545");
    }
}
