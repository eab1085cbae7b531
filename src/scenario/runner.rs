//! Scenario runner implementation
//!
//! Executes steps strictly in order against a [`ChainClient`], snapshotting
//! the tracked accounts before the first step and after the last one that
//! ran. A failing step is recorded and ends the run; it is never retried.

use std::collections::HashSet;
use std::time::Instant;

use colored::Colorize;
use tokio::sync::watch;

use crate::chain::{ensure_reachable, Account, ChainClient};
use crate::common::{Error, Result};

use super::result::{ScenarioResult, StepRecord};
use super::snapshot::AccountSnapshot;
use super::step::{Step, StepContext};

/// Runs one scenario against a chain
///
/// `run` borrows the runner immutably but is not meant to be called
/// concurrently; callers serialize runs.
pub struct ScenarioRunner<C: ChainClient> {
    name: String,
    client: C,
    accounts: Vec<Account>,
    steps: Vec<Step>,
    /// Print progress lines to stdout while running
    progress: bool,
    cancel: Option<watch::Receiver<bool>>,
}

impl<C: ChainClient> ScenarioRunner<C> {
    /// Validate and build a runner
    ///
    /// Fails when there are no steps, or when account labels or step tags repeat.
    pub fn new(
        name: impl Into<String>,
        client: C,
        accounts: Vec<Account>,
        steps: Vec<Step>,
    ) -> Result<Self> {
        if steps.is_empty() {
            return Err(Error::Configuration("scenario has no steps".to_string()));
        }

        let mut labels = HashSet::new();
        for account in &accounts {
            if !labels.insert(account.label.as_str()) {
                return Err(Error::Configuration(format!(
                    "account label '{}' is used more than once",
                    account.label
                )));
            }
        }

        let mut tags = HashSet::new();
        for step in &steps {
            if !tags.insert(step.tag.as_str()) {
                return Err(Error::Configuration(format!(
                    "step tag '{}' is used more than once",
                    step.tag
                )));
            }
        }

        Ok(Self {
            name: name.into(),
            client,
            accounts,
            steps,
            progress: false,
            cancel: None,
        })
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Stop between steps once `signal` turns true
    pub fn with_cancellation(mut self, signal: watch::Receiver<bool>) -> Self {
        self.cancel = Some(signal);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Execute the scenario
    ///
    /// Only an unreachable node (checked before anything else) or a failed
    /// read of the initial state is returned as an error. Step failures and
    /// a failed read of the final state end up in the result.
    pub async fn run(&self) -> Result<ScenarioResult> {
        if self.progress {
            println!("\n{}", "Checking if the node is running...".cyan());
        }
        let chain_id = ensure_reachable(&self.client).await?;
        if self.progress {
            println!("  {} Connected (chain id {})", "✓".green(), chain_id);
        }

        let before = AccountSnapshot::capture(&self.client, &self.accounts).await?;

        let mut ctx = StepContext::new(self.accounts.clone());
        let mut records = Vec::with_capacity(self.steps.len());
        let mut cancelled = false;

        if self.progress {
            println!("\n{}", "Running steps...".cyan());
        }

        for (i, step) in self.steps.iter().enumerate() {
            let step_num = i + 1;

            if self.cancelled() {
                tracing::warn!("Cancelled before step {} ({})", step_num, step.tag);
                cancelled = true;
                break;
            }

            if self.progress {
                let label = step.description.as_deref().unwrap_or(&step.tag);
                println!("  {}", label.dimmed());
            }
            tracing::debug!("Running step {} ({})", step_num, step.tag);

            let started = Instant::now();
            let outcome = step.execute(&self.client, &ctx).await;
            let elapsed = started.elapsed();

            match outcome {
                Ok(output) => {
                    tracing::debug!("Step {} ({}) done in {:.2?}", step_num, step.tag, elapsed);
                    ctx.record(&step.tag, output.clone());
                    records.push(StepRecord {
                        tag: step.tag.clone(),
                        outcome: Ok(output),
                        elapsed,
                    });
                }
                Err(e) => {
                    tracing::warn!("Step {} ({}) failed: {}", step_num, step.tag, e);
                    records.push(StepRecord {
                        tag: step.tag.clone(),
                        outcome: Err(Error::step_failed(&step.tag, e)),
                        elapsed,
                    });
                    break;
                }
            }
        }

        let (after, after_error) =
            match AccountSnapshot::capture(&self.client, &self.accounts).await {
                Ok(snapshot) => (Some(snapshot), None),
                Err(e) => {
                    tracing::error!("Could not read final account state: {}", e);
                    (None, Some(e))
                }
            };

        Ok(ScenarioResult {
            name: self.name.clone(),
            chain_id,
            before,
            after,
            after_error,
            steps: records,
            cancelled,
            steps_total: self.steps.len(),
        })
    }
}
