//! Command-line entry shared by the scenario binaries
//!
//! Loads configuration, prepares the tracked accounts, runs one built-in
//! scenario and prints its report.

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use tokio::sync::watch;

use crate::chain::RpcChainClient;
use crate::common::{Config, Result};
use crate::scenario::{accounts, report, BuiltinScenario, ScenarioResult, ScenarioRunner};

/// Options accepted by both scenario binaries
#[derive(Parser, Debug, Default)]
#[command(version, about = "Run an EIP-7702 self-destruct scenario against a local node")]
pub struct Args {
    /// JSON-RPC endpoint (overrides the config file)
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the result as JSON instead of the human report
    #[arg(long)]
    pub json: bool,

    /// Print step outputs and debug logs
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Effective configuration: the file (or defaults) plus flag overrides
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(url) = &self.rpc_url {
            config.rpc.url = url.clone();
        }
        Ok(config)
    }
}

/// Run `scenario` and print its report
///
/// Errors are returned only for problems before the first step: bad
/// configuration or an unreachable node. A failing step, or a node that
/// stops answering mid-run, still yields `Ok` with the failure recorded in
/// the result.
pub async fn run(scenario: BuiltinScenario, args: Args) -> Result<ScenarioResult> {
    let config = args.config()?;
    let funding = config.accounts.funding_wei()?;
    let definition = scenario.definition()?;
    let steps = definition.steps(funding)?;
    let client = RpcChainClient::new(&config)?;
    let progress = !args.json;

    if progress {
        println!("=== Testing {} ===", definition.name);
        if let Some(description) = &definition.description {
            println!("{}", description.trim().dimmed());
        }
    }

    let accounts = accounts::create(&client, &definition.accounts).await?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current step");
            let _ = cancel_tx.send(true);
        }
    });

    let runner = ScenarioRunner::new(definition.name.clone(), client, accounts, steps)?
        .with_progress(progress)
        .with_cancellation(cancel_rx);
    let result = runner.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report::to_json(&result))?);
    } else {
        report::print(&result, args.verbose);
    }

    Ok(result)
}
