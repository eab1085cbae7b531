//! Delegate Alice in one transaction, then self-destruct her in another

use clap::Parser;
use scenarios::cli::{self, Args};
use scenarios::common::logging;
use scenarios::scenario::BuiltinScenario;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init_cli(args.verbose);

    if let Err(e) = cli::run(BuiltinScenario::SeparateTransactions, args).await {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}
