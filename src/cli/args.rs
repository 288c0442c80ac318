use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay fare-ledger operations and report balances or rollups
#[derive(Parser, Debug)]
#[command(name = "fareway-ledger")]
#[command(about = "Replay fare-ledger operations from CSV and report balances or daily rollups", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing replay operations
    #[arg(value_name = "INPUT", help = "Path to the replay operations CSV file")]
    pub input_file: PathBuf,

    /// Route-table CSV used to quote issue operations
    #[arg(
        long = "routes",
        value_name = "ROUTES",
        help = "Path to the route-table CSV (required for 'issue' operations)"
    )]
    pub routes_file: Option<PathBuf>,

    /// Report to write to stdout
    #[arg(
        long = "report",
        value_name = "REPORT",
        default_value = "balances",
        help = "Report to produce: 'balances' for wallet balances or 'rollups' for daily ticket rollups"
    )]
    pub report: ReportKind,

    /// Processing strategy to use for replay
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for synchronous or 'async' for asynchronous"
    )]
    pub strategy: StrategyType,

    /// Number of operations per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of operations per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent batches (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of partitions replaying concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,
}

/// Available processing strategies
#[derive(Clone, Debug, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

/// Available reports
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    /// Wallet balances, one row per account
    Balances,
    /// Daily ticket rollups, one row per day
    Rollups,
}

impl CliArgs {
    /// Build a BatchConfig from CLI arguments, defaulting absent values
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}
