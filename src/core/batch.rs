//! Batch replay with key-based partitioning
//!
//! Partitions a batch of operations by their partition key (account for
//! wallet operations, bus for issuance) so different keys replay
//! concurrently while each key's operations stay in input order. The
//! ledger's CAS writes would stay correct under any interleaving;
//! partitioning keeps per-account replay deterministic and avoids
//! burning CAS retries on self-contention.

use crate::core::engine::ReplayEngine;
use crate::types::{LedgerError, ReplayOp};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

/// Outcome of replaying a single operation
#[derive(Debug)]
pub struct ReplayResult {
    /// The operation that was applied
    pub op: ReplayOp,

    /// The result of applying it
    pub result: Result<(), LedgerError>,
}

/// Replays batches of operations with key-based partitioning
///
/// Cloneable; clones share the underlying engine.
#[derive(Clone)]
pub struct BatchProcessor {
    engine: Arc<ReplayEngine>,
}

impl BatchProcessor {
    /// Create a processor over a shared engine
    pub fn new(engine: Arc<ReplayEngine>) -> Self {
        Self { engine }
    }

    /// Partition a batch by partition key, preserving per-key order
    ///
    /// Every operation lands in exactly one sub-batch; operations
    /// sharing a key keep their original relative order.
    pub fn partition_by_key(&self, batch: Vec<ReplayOp>) -> HashMap<String, Vec<ReplayOp>> {
        let mut partitions: HashMap<String, Vec<ReplayOp>> = HashMap::new();
        for op in batch {
            partitions
                .entry(op.partition_key().to_string())
                .or_default()
                .push(op);
        }
        partitions
    }

    /// Apply one key's operations sequentially, in order
    ///
    /// A failed operation is captured in its result and does not stop
    /// the rest of the key's operations.
    pub async fn process_key_ops(&self, ops: Vec<ReplayOp>) -> Vec<ReplayResult> {
        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            let result = self.engine.apply(op.clone()).await;
            results.push(ReplayResult { op, result });
        }
        results
    }

    /// Replay a batch, one concurrent task per partition key
    ///
    /// Results may come back in any order across keys; within a key
    /// they follow input order.
    pub async fn process_batch(&self, batch: Vec<ReplayOp>) -> Vec<ReplayResult> {
        let partitions = self.partition_by_key(batch);

        let mut tasks = Vec::with_capacity(partitions.len());
        for (_key, ops) in partitions {
            let processor = self.clone();
            tasks.push(tokio::spawn(
                async move { processor.process_key_ops(ops).await },
            ));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(key_results) => results.extend(key_results),
                Err(e) => error!(error = %e, "replay task panicked"),
            }
        }
        results
    }
}
