//! Scenario definition types
//!
//! Defines the data structures for deserializing YAML scenario definitions
//! and turning them into runnable steps.

use std::collections::HashSet;

use ethers::types::U256;
use ethers::utils::parse_ether;
use serde::Deserialize;

use crate::chain::ContractArtifact;
use crate::common::{Error, Result};

use super::actions::ChainAction;
use super::step::Step;

/// A complete scenario loaded from YAML
#[derive(Deserialize, Debug)]
pub struct ScenarioDefinition {
    /// Name of the scenario, printed as the report header
    pub name: String,
    /// Optional description of what the scenario shows
    pub description: Option<String>,
    /// Labels of the accounts to create and track
    pub accounts: Vec<String>,
    /// The sequence of steps to execute
    pub steps: Vec<StepDefinition>,
}

/// A single step in the scenario
#[derive(Deserialize, Debug)]
pub struct StepDefinition {
    /// Unique tag; later steps refer to this step's output by it
    pub tag: String,
    /// Progress line printed before the step runs
    pub description: Option<String>,
    #[serde(flatten)]
    pub action: ActionDefinition,
}

/// What a step does
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionDefinition {
    /// Send ether from the deployer to an account
    Fund {
        to: String,
        /// Ether amount (default: the configured funding amount)
        value: Option<String>,
    },
    /// Deploy a known contract from the deployer
    Deploy { contract: String },
    /// Sign an EIP-7702 authorization
    SignAuthorization {
        /// Label of the signing account
        account: String,
        /// Tag of the deploy step whose contract is the delegate
        contract: String,
        /// Whether another account submits the authorization (default: true)
        #[serde(default = "default_delegate")]
        delegate: bool,
    },
    /// Send a plain transaction
    SendTransaction {
        from: String,
        to: String,
        /// Ether amount (default: 0)
        value: Option<String>,
        /// Tags of sign_authorization steps to attach
        #[serde(default)]
        authorizations: Vec<String>,
    },
    /// Call a zero-argument contract function
    WriteContract {
        from: String,
        address: String,
        contract: String,
        function: String,
        /// Tags of sign_authorization steps to attach
        #[serde(default)]
        authorizations: Vec<String>,
    },
    /// Record the state of the tracked accounts
    Observe,
}

fn default_delegate() -> bool {
    true
}

fn parse_value(value: &str) -> Result<U256> {
    parse_ether(value)
        .map_err(|e| Error::Configuration(format!("Invalid ether amount '{}': {}", value, e)))
}

fn find_artifact(name: &str) -> Result<&'static ContractArtifact> {
    ContractArtifact::find(name)
        .ok_or_else(|| Error::Configuration(format!("Unknown contract '{}'", name)))
}

impl ScenarioDefinition {
    /// Parse a definition from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Configuration(format!("Failed to parse scenario: {}", e)))
    }

    /// Build runnable steps
    ///
    /// Fails on unknown contracts, malformed amounts, and references to
    /// steps that are not declared earlier.
    pub fn steps(&self, funding: U256) -> Result<Vec<Step>> {
        let mut declared: HashSet<&str> = HashSet::new();
        let mut steps = Vec::with_capacity(self.steps.len());

        for def in &self.steps {
            let action = def.action.resolve(funding, &declared)?;
            let mut step = Step::new(def.tag.clone(), action);
            if let Some(description) = &def.description {
                step = step.with_description(description.clone());
            }
            steps.push(step);
            declared.insert(def.tag.as_str());
        }

        Ok(steps)
    }
}

impl ActionDefinition {
    fn resolve(&self, funding: U256, declared: &HashSet<&str>) -> Result<ChainAction> {
        let check_declared = |tag: &str| {
            if declared.contains(tag) {
                Ok(())
            } else {
                Err(Error::Configuration(format!(
                    "Step '{}' is referenced before it is declared",
                    tag
                )))
            }
        };

        let action = match self {
            ActionDefinition::Fund { to, value } => ChainAction::Fund {
                to: to.clone(),
                value: match value {
                    Some(v) => parse_value(v)?,
                    None => funding,
                },
            },
            ActionDefinition::Deploy { contract } => ChainAction::Deploy {
                artifact: find_artifact(contract)?,
            },
            ActionDefinition::SignAuthorization {
                account,
                contract,
                delegate,
            } => {
                check_declared(contract.as_str())?;
                ChainAction::SignAuthorization {
                    account: account.clone(),
                    contract: contract.clone(),
                    delegate: *delegate,
                }
            }
            ActionDefinition::SendTransaction {
                from,
                to,
                value,
                authorizations,
            } => {
                for tag in authorizations {
                    check_declared(tag.as_str())?;
                }
                ChainAction::SendTransaction {
                    from: from.clone(),
                    to: to.clone(),
                    value: match value {
                        Some(v) => parse_value(v)?,
                        None => U256::zero(),
                    },
                    authorizations: authorizations.clone(),
                }
            }
            ActionDefinition::WriteContract {
                from,
                address,
                contract,
                function,
                authorizations,
            } => {
                for tag in authorizations {
                    check_declared(tag.as_str())?;
                }
                let artifact = find_artifact(contract)?;
                artifact.signature(function).map_err(|e| Error::Configuration(e.to_string()))?;
                ChainAction::WriteContract {
                    from: from.clone(),
                    address: address.clone(),
                    artifact,
                    function: function.clone(),
                    authorizations: authorizations.clone(),
                }
            }
            ActionDefinition::Observe => ChainAction::Observe,
        };

        Ok(action)
    }
}
