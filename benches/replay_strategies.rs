//! Benchmark suite for comparing replay strategies
//!
//! Compares the synchronous and asynchronous replay pipelines using the
//! divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! # Benchmark Fixtures
//!
//! Two representative CSV files are used:
//! - `benchmark_small.csv` - 100 operations
//! - `benchmark_medium.csv` - 1,000 operations
//!
//! Each fixture mixes top-ups and debits across multiple accounts so
//! the async strategy has partitions to parallelize over.

use fareway_ledger::cli::{ReportKind, StrategyType};
use fareway_ledger::strategy::create_strategy;
use fareway_ledger::strategy::BatchConfig;
use std::path::Path;

fn main() {
    divan::main();
}

fn run(strategy_type: StrategyType, fixture: &str) {
    let config = match strategy_type {
        StrategyType::Sync => None,
        StrategyType::Async => Some(BatchConfig::default()),
    };
    let strategy = create_strategy(strategy_type, config);
    let path = Path::new(fixture);
    let mut output = Vec::new();

    strategy
        .process(path, None, ReportKind::Balances, &mut output)
        .expect("Replay failed");
}

/// Synchronous replay with small dataset (100 operations)
#[divan::bench]
fn sync_strategy_small() {
    run(StrategyType::Sync, "benches/fixtures/benchmark_small.csv");
}

/// Asynchronous replay with small dataset (100 operations)
#[divan::bench]
fn async_strategy_small() {
    run(StrategyType::Async, "benches/fixtures/benchmark_small.csv");
}

/// Synchronous replay with medium dataset (1,000 operations)
#[divan::bench]
fn sync_strategy_medium() {
    run(StrategyType::Sync, "benches/fixtures/benchmark_medium.csv");
}

/// Asynchronous replay with medium dataset (1,000 operations)
#[divan::bench]
fn async_strategy_medium() {
    run(StrategyType::Async, "benches/fixtures/benchmark_medium.csv");
}
