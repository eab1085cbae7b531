//! Chain actions available to scenario definitions
//!
//! Every transaction-sending action waits for its receipt, so the state a
//! later step observes already includes it. A reverted transaction fails the
//! step.

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};

use crate::chain::{
    ChainClient, ContractArtifact, ContractCall, Receipt, SignedAuthorization, TransactionRequest,
};
use crate::common::{Error, Result};

use super::snapshot::AccountSnapshot;
use super::step::{Action, StepContext, StepOutput};

/// Account name that refers to the client's pre-funded deployer
pub const DEPLOYER: &str = "deployer";

/// One chain operation with all values already parsed
#[derive(Debug, Clone)]
pub enum ChainAction {
    /// Deployer sends `value` wei to an account
    Fund { to: String, value: U256 },
    /// Deployer deploys a contract
    Deploy { artifact: &'static ContractArtifact },
    /// `account` signs an authorization delegating to the contract deployed by step `contract`
    SignAuthorization {
        account: String,
        contract: String,
        delegate: bool,
    },
    /// Plain transaction, optionally carrying authorizations signed by earlier steps
    SendTransaction {
        from: String,
        to: String,
        value: U256,
        authorizations: Vec<String>,
    },
    /// Zero-argument contract call, optionally carrying authorizations
    WriteContract {
        from: String,
        address: String,
        artifact: &'static ContractArtifact,
        function: String,
        authorizations: Vec<String>,
    },
    /// Read the tracked accounts
    Observe,
}

impl ChainAction {
    fn sender(client: &dyn ChainClient, ctx: &StepContext, name: &str) -> Result<Address> {
        if name.eq_ignore_ascii_case(DEPLOYER) {
            Ok(client.deployer())
        } else {
            Ok(ctx.account(name)?.address)
        }
    }

    fn authorizations(
        ctx: &StepContext,
        tags: &[String],
    ) -> Result<Vec<SignedAuthorization>> {
        tags.iter().map(|tag| ctx.authorization(tag)).collect()
    }

    async fn mined(client: &dyn ChainClient, hash: H256) -> Result<Receipt> {
        let receipt = client.wait_for_receipt(hash).await?;
        if !receipt.succeeded() {
            return Err(Error::Reverted(hash));
        }
        Ok(receipt)
    }
}

#[async_trait]
impl Action for ChainAction {
    async fn execute(&self, client: &dyn ChainClient, ctx: &StepContext) -> Result<StepOutput> {
        match self {
            ChainAction::Fund { to, value } => {
                let to = ctx.resolve(to)?;
                let hash = client
                    .send_transaction(client.deployer(), TransactionRequest::transfer(to, *value))
                    .await?;
                Ok(StepOutput::Transaction(Self::mined(client, hash).await?))
            }

            ChainAction::Deploy { artifact } => {
                let hash = client.deploy_contract(client.deployer(), artifact).await?;
                let receipt = Self::mined(client, hash).await?;
                let address = receipt
                    .contract_address
                    .ok_or_else(|| Error::missing_output(artifact.name, "contract address"))?;
                tracing::info!("{} deployed at {:?}", artifact.name, address);
                Ok(StepOutput::Deployed { address, receipt })
            }

            ChainAction::SignAuthorization {
                account,
                contract,
                delegate,
            } => {
                let authority = ctx.account(account)?.address;
                let contract = ctx.contract_address(contract)?;
                let auth = client
                    .sign_authorization(authority, contract, *delegate)
                    .await?;
                tracing::debug!(
                    "{} authorized delegation to {:?} (nonce {})",
                    account,
                    contract,
                    auth.nonce
                );
                Ok(StepOutput::Authorization(auth))
            }

            ChainAction::SendTransaction {
                from,
                to,
                value,
                authorizations,
            } => {
                let from = Self::sender(client, ctx, from)?;
                let request = TransactionRequest::transfer(ctx.resolve(to)?, *value)
                    .with_authorizations(Self::authorizations(ctx, authorizations)?);
                let hash = client.send_transaction(from, request).await?;
                Ok(StepOutput::Transaction(Self::mined(client, hash).await?))
            }

            ChainAction::WriteContract {
                from,
                address,
                artifact,
                function,
                authorizations,
            } => {
                let from = Self::sender(client, ctx, from)?;
                let call = ContractCall::new(ctx.resolve(address)?, *artifact, function)
                    .with_authorizations(Self::authorizations(ctx, authorizations)?);
                let hash = client.write_contract(from, call).await?;
                Ok(StepOutput::Transaction(Self::mined(client, hash).await?))
            }

            ChainAction::Observe => {
                let snapshot = AccountSnapshot::capture(client, ctx.accounts()).await?;
                Ok(StepOutput::Observation(snapshot))
            }
        }
    }
}
