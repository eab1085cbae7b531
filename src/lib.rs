//! EIP-7702 self-destruct scenarios
//!
//! Runs scripted transaction scenarios against a local dev node and reports
//! how an account's code and balance change when it delegates to a contract
//! that self-destructs.

pub mod chain;
pub mod cli;
pub mod common;
pub mod scenario;

pub use chain::{ChainClient, RpcChainClient};
pub use common::{Config, Error, Result};
pub use scenario::{ScenarioResult, ScenarioRunner, Step};
