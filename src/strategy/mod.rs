//! Processing strategy module for the replay tool
//!
//! Defines the Strategy pattern for complete replay pipelines, from CSV
//! input through the replay engine to report output. Different
//! implementations (synchronous, asynchronous batch) are selected at
//! runtime.

use crate::cli::{ReportKind, StrategyType};
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// A complete replay pipeline
///
/// Each strategy reads replay operations from a CSV file, applies them
/// through the replay engine, and writes the requested report to the
/// output writer.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay operations from `input_path` and write the report
    ///
    /// `routes_path` points at the route-table CSV used to quote
    /// issuance operations; without one, any `issue` row is fatal.
    ///
    /// Fatal errors (missing input file, unreadable route table, an
    /// issuance with no route table, I/O failure on output) are
    /// returned. Per-row parse and application errors are logged and
    /// replay continues.
    fn process(
        &self,
        input_path: &Path,
        routes_path: Option<&Path>,
        report: ReportKind,
        output: &mut dyn Write,
    ) -> Result<(), String>;
}

/// Write the requested report from the engine's final state
pub(crate) async fn write_report(
    engine: &crate::core::ReplayEngine,
    report: ReportKind,
    output: &mut dyn Write,
) -> Result<(), String> {
    match report {
        ReportKind::Balances => {
            let balances = engine
                .balances_report()
                .await
                .map_err(|e| format!("Failed to build balances report: {}", e))?;
            crate::io::write_balances_csv(&balances, output)
        }
        ReportKind::Rollups => {
            let rollups = engine
                .rollups_report()
                .await
                .map_err(|e| format!("Failed to build rollups report: {}", e))?;
            crate::io::write_rollups_csv(&rollups, output)
        }
    }
}

/// Select a processing strategy at runtime
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
