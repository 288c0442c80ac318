//! Fareway Ledger CLI
//!
//! Command-line replay tool for the fare ledger engine.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- ops.csv > balances.csv
//! cargo run -- --report rollups --routes routes.csv ops.csv > rollups.csv
//! cargo run -- --strategy sync ops.csv > balances.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 ops.csv > balances.csv
//! ```
//!
//! The program reads replay operations from the input CSV, applies them
//! through the ledger engine using the selected strategy, and writes
//! the requested report to stdout. Diagnostics go to stderr so stdout
//! stays valid CSV.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, issuance without a route table, etc.)

use fareway_ledger::cli;
use fareway_ledger::strategy;
use std::process;
use tracing_subscriber::EnvFilter;

/// Send structured logs to stderr; stdout is reserved for report CSV.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let args = cli::parse_args();

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config)
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(
        &args.input_file,
        args.routes_file.as_deref(),
        args.report,
        &mut output,
    ) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
