//! Scenarios shipped with the binaries

use crate::common::Result;

use super::definition::ScenarioDefinition;

/// A scenario embedded at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinScenario {
    /// Delegate in one transaction, self-destruct in a later one
    SeparateTransactions,
    /// Delegate and self-destruct in the same transaction
    SameTransaction,
}

impl BuiltinScenario {
    pub const ALL: [BuiltinScenario; 2] = [
        BuiltinScenario::SeparateTransactions,
        BuiltinScenario::SameTransaction,
    ];

    /// Raw YAML source
    pub fn source(self) -> &'static str {
        match self {
            BuiltinScenario::SeparateTransactions => {
                include_str!("../../scenarios/selfdestruct_diff_tx.yaml")
            }
            BuiltinScenario::SameTransaction => {
                include_str!("../../scenarios/selfdestruct_same_tx.yaml")
            }
        }
    }

    pub fn definition(self) -> Result<ScenarioDefinition> {
        ScenarioDefinition::from_yaml(self.source())
    }
}

#[cfg(test)]
mod tests {
    use ethers::types::U256;

    use super::*;
    use crate::scenario::definition::ActionDefinition;

    #[test]
    fn test_builtin_scenarios_build() {
        for scenario in BuiltinScenario::ALL {
            let def = scenario.definition().unwrap();
            assert_eq!(def.accounts, vec!["Alice".to_string(), "Bob".to_string()]);
            let steps = def.steps(U256::exp10(18)).unwrap();
            assert_eq!(steps.len(), def.steps.len());
        }
    }

    #[test]
    fn test_same_tx_destroys_with_authorization_attached() {
        let def = BuiltinScenario::SameTransaction.definition().unwrap();
        let destroy = def
            .steps
            .iter()
            .find(|s| matches!(s.action, ActionDefinition::WriteContract { .. }))
            .unwrap();
        match &destroy.action {
            ActionDefinition::WriteContract { authorizations, .. } => {
                assert_eq!(authorizations.len(), 1)
            }
            _ => unreachable!(),
        }
        assert!(!def
            .steps
            .iter()
            .any(|s| matches!(s.action, ActionDefinition::SendTransaction { .. })));
    }
}
