//! Outcome of a scenario run

use std::time::Duration;

use crate::common::Error;

use super::snapshot::{diff, AccountDiff, AccountSnapshot};
use super::step::StepOutput;

/// Outcome of one executed step
#[derive(Debug)]
pub struct StepRecord {
    pub tag: String,
    /// Output on success, `Error::StepExecution` on failure
    pub outcome: Result<StepOutput, Error>,
    pub elapsed: Duration,
}

impl StepRecord {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn output(&self) -> Option<&StepOutput> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }
}

/// Everything a run produced, in execution order
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub chain_id: u64,
    pub before: AccountSnapshot,
    /// Final state; `None` when the node could not be read after the steps
    pub after: Option<AccountSnapshot>,
    /// Why the final state could not be read
    pub after_error: Option<Error>,
    /// One record per executed step; steps after a failure are absent
    pub steps: Vec<StepRecord>,
    /// Set when the run stopped on a cancellation signal
    pub cancelled: bool,
    /// Number of steps the scenario declared
    pub steps_total: usize,
}

impl ScenarioResult {
    /// Whether every declared step ran and succeeded
    pub fn passed(&self) -> bool {
        !self.cancelled
            && self.after.is_some()
            && self.steps.len() == self.steps_total
            && self.steps.iter().all(StepRecord::succeeded)
    }

    /// The step that stopped the run, if any
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| !s.succeeded())
    }

    /// Output of the step tagged `tag`
    pub fn output(&self, tag: &str) -> Option<&StepOutput> {
        self.steps
            .iter()
            .find(|s| s.tag == tag)
            .and_then(StepRecord::output)
    }

    /// Per-account changes between the before and after snapshots
    ///
    /// Empty when the after snapshot is missing.
    pub fn changes(&self) -> Vec<AccountDiff> {
        match &self.after {
            Some(after) => diff(&self.before, after),
            None => Vec::new(),
        }
    }
}
