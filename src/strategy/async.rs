//! Asynchronous batch processing strategy
//!
//! Multi-threaded replay: reads operations in batches and processes
//! each batch with key-based partitioning. Batches run sequentially so
//! an account whose operations span batches still sees them in file
//! order; within a batch, different partition keys replay in parallel
//! on a tokio multi-threaded runtime.

use crate::cli::ReportKind;
use crate::core::{BatchProcessor, ReplayEngine};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::load_route_index;
use crate::store::MemoryStore;
use crate::strategy::{write_report, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Configuration for batch replay
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of operations per batch
    pub batch_size: usize,
    /// Worker threads for the runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a config, falling back to defaults for zero values
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                requested = batch_size,
                fallback = default.batch_size,
                "invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                requested = max_concurrent_batches,
                fallback = default.max_concurrent_batches,
                "invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    /// Create a strategy with the given batch configuration
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        input_path: &Path,
        routes_path: Option<&Path>,
        report: ReportKind,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let routes = routes_path.map(load_route_index).transpose()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let engine = Arc::new(ReplayEngine::new(Arc::new(MemoryStore::new()), routes));
            let processor = BatchProcessor::new(Arc::clone(&engine));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            // Batches run sequentially so per-key ordering holds across
            // the whole file, not just within one batch.
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for replayed in processor.process_batch(batch).await {
                    if let Err(e) = replayed.result {
                        if matches!(e, LedgerError::RouteTableMissing) {
                            return Err(e.to_string());
                        }
                        warn!(error = %e, op = ?replayed.op, "operation failed");
                    }
                }
            }

            write_report(&engine, report, output).await
        })
    }
}
