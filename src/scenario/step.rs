//! Steps, their outputs, and the context threaded between them

use async_trait::async_trait;
use ethers::types::Address;
use serde::Serialize;

use crate::chain::{Account, ChainClient, Receipt, SignedAuthorization};
use crate::common::{Error, Result};

use super::snapshot::AccountSnapshot;

/// Value produced by a successful step
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutput {
    /// A contract was deployed
    Deployed { address: Address, receipt: Receipt },
    /// A transaction was mined
    Transaction(Receipt),
    /// An authorization was signed
    Authorization(SignedAuthorization),
    /// State of the tracked accounts was read
    Observation(AccountSnapshot),
    /// Nothing worth keeping
    Empty,
}

impl StepOutput {
    /// Receipt of the transaction this step sent, if it sent one
    pub fn receipt(&self) -> Option<&Receipt> {
        match self {
            StepOutput::Deployed { receipt, .. } | StepOutput::Transaction(receipt) => Some(receipt),
            _ => None,
        }
    }
}

/// Read-only view a step gets of the scenario so far
#[derive(Debug, Default)]
pub struct StepContext {
    accounts: Vec<Account>,
    /// Outputs of completed steps, in execution order
    outputs: Vec<(String, StepOutput)>,
}

impl StepContext {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            accounts,
            outputs: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, tag: &str, output: StepOutput) {
        self.outputs.push((tag.to_string(), output));
    }

    /// Tracked accounts
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Tracked account by label
    pub fn account(&self, label: &str) -> Result<&Account> {
        self.accounts
            .iter()
            .find(|a| a.label == label)
            .ok_or_else(|| Error::UnknownAccount(label.to_string()))
    }

    /// Output of a prior step
    pub fn output(&self, tag: &str) -> Option<&StepOutput> {
        self.outputs
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, output)| output)
    }

    /// Address of the contract deployed by step `tag`
    pub fn contract_address(&self, tag: &str) -> Result<Address> {
        match self.output(tag) {
            Some(StepOutput::Deployed { address, .. }) => Ok(*address),
            _ => Err(Error::missing_output(tag, "deployed contract")),
        }
    }

    /// Authorization signed by step `tag`
    pub fn authorization(&self, tag: &str) -> Result<SignedAuthorization> {
        match self.output(tag) {
            Some(StepOutput::Authorization(auth)) => Ok(auth.clone()),
            _ => Err(Error::missing_output(tag, "authorization")),
        }
    }

    /// Resolve an address reference
    ///
    /// `zero`, a `0x` literal, a tracked account label, or the tag of a deploy step.
    pub fn resolve(&self, reference: &str) -> Result<Address> {
        if reference == "zero" {
            return Ok(Address::zero());
        }
        if reference.starts_with("0x") {
            return reference
                .parse()
                .map_err(|_| Error::UnknownAccount(reference.to_string()));
        }
        if let Ok(account) = self.account(reference) {
            return Ok(account.address);
        }
        self.contract_address(reference)
            .map_err(|_| Error::UnknownAccount(reference.to_string()))
    }
}

/// Work performed by a step
#[async_trait]
pub trait Action: Send + Sync {
    async fn execute(&self, client: &dyn ChainClient, ctx: &StepContext) -> Result<StepOutput>;
}

/// A named unit of work; a failure aborts the scenario
pub struct Step {
    pub tag: String,
    /// Progress line printed before the step runs
    pub description: Option<String>,
    action: Box<dyn Action>,
}

impl Step {
    pub fn new(tag: impl Into<String>, action: impl Action + 'static) -> Self {
        Self {
            tag: tag.into(),
            description: None,
            action: Box::new(action),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub(crate) async fn execute(
        &self,
        client: &dyn ChainClient,
        ctx: &StepContext,
    ) -> Result<StepOutput> {
        self.action.execute(client, ctx).await
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("tag", &self.tag)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::H256;

    fn receipt() -> Receipt {
        Receipt {
            transaction_hash: H256::repeat_byte(0xaa),
            block_number: None,
            status: None,
            contract_address: None,
            gas_used: None,
            transaction_type: None,
        }
    }

    fn context() -> StepContext {
        let mut ctx = StepContext::new(vec![
            Account::new("Alice", Address::repeat_byte(0x0a)),
            Account::new("Bob", Address::repeat_byte(0x0b)),
        ]);
        ctx.record(
            "deploy",
            StepOutput::Deployed {
                address: Address::repeat_byte(0xcc),
                receipt: receipt(),
            },
        );
        ctx
    }

    #[test]
    fn test_resolve_references() {
        let ctx = context();
        assert_eq!(ctx.resolve("zero").unwrap(), Address::zero());
        assert_eq!(ctx.resolve("Bob").unwrap(), Address::repeat_byte(0x0b));
        assert_eq!(ctx.resolve("deploy").unwrap(), Address::repeat_byte(0xcc));
        assert_eq!(
            ctx.resolve("0x0000000000000000000000000000000000000001").unwrap(),
            Address::from_low_u64_be(1)
        );
        assert!(matches!(ctx.resolve("Carol"), Err(Error::UnknownAccount(_))));
        assert!(matches!(ctx.resolve("0xnothex"), Err(Error::UnknownAccount(_))));
    }

    #[test]
    fn test_typed_output_lookup() {
        let ctx = context();
        assert_eq!(ctx.contract_address("deploy").unwrap(), Address::repeat_byte(0xcc));
        assert!(ctx.output("deploy").unwrap().receipt().is_some());
        // deploy output is not an authorization
        assert!(matches!(
            ctx.authorization("deploy"),
            Err(Error::MissingOutput { .. })
        ));
        assert!(matches!(
            ctx.contract_address("missing"),
            Err(Error::MissingOutput { .. })
        ));
    }
}
