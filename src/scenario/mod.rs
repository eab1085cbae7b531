//! Scenario execution
//!
//! A scenario is an ordered list of [`Step`]s run by a [`ScenarioRunner`]
//! against a [`ChainClient`](crate::chain::ChainClient). Scenarios are
//! usually declared in YAML ([`ScenarioDefinition`]); the two shipped with
//! the binaries are exposed as [`BuiltinScenario`].

pub mod accounts;
pub mod actions;
pub mod builtin;
pub mod definition;
pub mod report;
mod result;
mod runner;
pub mod snapshot;
mod step;

pub use builtin::BuiltinScenario;
pub use definition::ScenarioDefinition;
pub use result::{ScenarioResult, StepRecord};
pub use runner::ScenarioRunner;
pub use snapshot::{AccountSnapshot, AccountState};
pub use step::{Action, Step, StepContext, StepOutput};
