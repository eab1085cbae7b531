//! Chain access used by the scenario runner
//!
//! [`ChainClient`] is everything a scenario needs from a node: liveness,
//! state reads, identities, and transaction submission. [`RpcChainClient`]
//! implements it over JSON-RPC against a local dev node.

pub mod client;
pub mod codec;
pub mod contract;
pub mod rpc;
pub mod types;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

use crate::common::{Error, Result};

pub use client::RpcChainClient;
pub use contract::{ContractArtifact, SIMPLE_DELEGATION};
pub use types::*;

/// Operations a scenario performs against a chain
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Human-readable location of the node, for messages
    fn endpoint(&self) -> String;

    /// Pre-funded identity used to fund accounts and deploy contracts
    fn deployer(&self) -> Address;

    /// Chain id; doubles as the liveness check
    async fn chain_id(&self) -> Result<u64>;

    async fn get_code(&self, address: Address) -> Result<Bytes>;

    async fn get_balance(&self, address: Address) -> Result<U256>;

    /// Create a fresh identity whose key the client holds
    async fn create_account(&self, label: &str) -> Result<Account>;

    /// Submit a contract creation from `from`
    async fn deploy_contract(&self, from: Address, artifact: &ContractArtifact) -> Result<H256>;

    /// Wait until `hash` is mined
    async fn wait_for_receipt(&self, hash: H256) -> Result<Receipt>;

    /// Sign an authorization for `authority` to delegate to `contract`
    ///
    /// With `delegate` set, another account submits the transaction carrying
    /// it, so the authorization uses the authority's current nonce. Otherwise
    /// the authority submits it itself and the nonce is one ahead.
    async fn sign_authorization(
        &self,
        authority: Address,
        contract: Address,
        delegate: bool,
    ) -> Result<SignedAuthorization>;

    async fn send_transaction(&self, from: Address, request: TransactionRequest) -> Result<H256>;

    async fn write_contract(&self, from: Address, call: ContractCall) -> Result<H256>;
}

/// Probe the node, mapping any failure to [`Error::UnreachableNode`]
pub async fn ensure_reachable(client: &dyn ChainClient) -> Result<u64> {
    client.chain_id().await.map_err(|e| {
        tracing::error!("Node at {} is unreachable: {}", client.endpoint(), e);
        Error::UnreachableNode(format!("{}: {}", client.endpoint(), e))
    })
}
