//! Synchronous processing strategy
//!
//! Single-threaded replay: streams operations from the CSV one at a
//! time and applies them in file order. The replay engine's store
//! interface is async, so this strategy drives it on a current-thread
//! runtime; no worker threads are spawned.
//!
//! Because every operation is applied in input order, this strategy is
//! the reference behavior for replay semantics.

use crate::cli::ReportKind;
use crate::core::ReplayEngine;
use crate::io::csv_format::load_route_index;
use crate::io::sync_reader::SyncReader;
use crate::store::MemoryStore;
use crate::strategy::{write_report, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Synchronous processing strategy
///
/// Send + Sync despite being single-threaded, so it fits behind the
/// same trait object as the async strategy.
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        input_path: &Path,
        routes_path: Option<&Path>,
        report: ReportKind,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let routes = routes_path.map(load_route_index).transpose()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let engine = ReplayEngine::new(Arc::new(MemoryStore::new()), routes);
            let reader = SyncReader::new(input_path)?;

            for result in reader {
                match result {
                    Ok(op) => {
                        if let Err(e) = engine.apply(op).await {
                            // An issuance with no route table means the
                            // whole run was misconfigured.
                            if matches!(e, LedgerError::RouteTableMissing) {
                                return Err(e.to_string());
                            }
                            warn!(error = %e, "operation failed");
                        }
                    }
                    Err(e) => warn!(error = %e, "skipping invalid replay row"),
                }
            }

            write_report(&engine, report, output).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as IoWrite;
    use tempfile::NamedTempFile;

    const OPS_HEADER: &str = "op,account,amount,bus,pickup,destination,service,persons,at\n";

    fn create_temp_csv(header: &str, rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(header.as_bytes())
            .expect("Failed to write header");
        file.write_all(rows.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn routes_file() -> NamedTempFile {
        create_temp_csv(
            "route_number,origin,destination,service_type,fare\n",
            "EX1-22,Colombo,Kandy,AC,450\n",
        )
    }

    #[test]
    fn test_sync_strategy_balances_report() {
        let file = create_temp_csv(
            OPS_HEADER,
            "topup,alice,1500,,,,,,\n\
             debit,alice,1350,NB-1,,,,3,\n",
        );

        let strategy = SyncProcessingStrategy;
        let mut output = Vec::new();
        strategy
            .process(file.path(), None, ReportKind::Balances, &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,balance\nalice,150.00\n"
        );
    }

    #[test]
    fn test_sync_strategy_rollups_report_with_routes() {
        let file = create_temp_csv(
            OPS_HEADER,
            "issue,,,NB-1,Kandy,Colombo,AC,3,2024-03-01T10:00:00Z\n",
        );
        let routes = routes_file();

        let strategy = SyncProcessingStrategy;
        let mut output = Vec::new();
        strategy
            .process(
                file.path(),
                Some(routes.path()),
                ReportKind::Rollups,
                &mut output,
            )
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "day,tickets,passengers,total_fare\n2024-03-01,1,3,1350.00\n"
        );
    }

    #[test]
    fn test_sync_strategy_issue_without_routes_is_fatal() {
        let file = create_temp_csv(OPS_HEADER, "issue,,,NB-1,Colombo,Kandy,AC,1,\n");

        let strategy = SyncProcessingStrategy;
        let mut output = Vec::new();
        let result = strategy.process(file.path(), None, ReportKind::Rollups, &mut output);

        assert!(result.is_err());
    }

    #[test]
    fn test_sync_strategy_missing_input_file() {
        let strategy = SyncProcessingStrategy;
        let mut output = Vec::new();
        let result = strategy.process(
            Path::new("nonexistent.csv"),
            None,
            ReportKind::Balances,
            &mut output,
        );

        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_strategy_continues_on_failed_operation() {
        // The rejected debit must not stop the following top-up.
        let file = create_temp_csv(
            OPS_HEADER,
            "topup,alice,100,,,,,,\n\
             debit,alice,500,NB-1,,,,1,\n\
             topup,alice,50,,,,,,\n",
        );

        let strategy = SyncProcessingStrategy;
        let mut output = Vec::new();
        strategy
            .process(file.path(), None, ReportKind::Balances, &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,balance\nalice,150.00\n"
        );
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
