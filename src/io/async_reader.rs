//! Asynchronous CSV reader with batch interface
//!
//! Streams replay operations from an async reader in batches for the
//! concurrent replay path. Invalid rows are logged and skipped so one
//! bad row never sinks a batch.

use crate::io::csv_format::{convert_op_record, OpCsvRecord};
use crate::types::ReplayOp;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous batch reader over replay operations
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Wrap an async reader providing replay CSV data
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` operations
    ///
    /// Rows that fail to parse or convert are logged and skipped; they
    /// do not count toward the batch size. An empty vector means end of
    /// input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<ReplayOp> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<OpCsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(record)) => match convert_op_record(record) {
                    Ok(op) => batch.push(op),
                    Err(e) => warn!(error = %e, "skipping invalid replay row"),
                },
                Some(Err(e)) => warn!(error = %e, "skipping unparseable replay row"),
                None => break,
            }
        }

        batch
    }
}
