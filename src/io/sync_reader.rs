//! Synchronous CSV reader with iterator interface
//!
//! Streams replay operations from a CSV file one row at a time, without
//! loading the file into memory. Format concerns live in the
//! `csv_format` module; this type only handles the file and the line
//! numbering for error messages.

use crate::io::csv_format::{convert_op_record, OpCsvRecord};
use crate::types::ReplayOp;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous streaming reader over replay operations
///
/// Implements `Iterator`, yielding `Result<ReplayOp, String>` per row.
/// Fatal errors (file missing, unreadable) surface from `new`;
/// per-row parse and conversion errors come back as `Err` items so the
/// caller can log and continue.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Open a replay CSV for streaming iteration
    ///
    /// The reader trims whitespace and allows rows to omit trailing
    /// optional columns.
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<ReplayOp, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<OpCsvRecord>();

        match deserializer.next()? {
            Ok(record) => {
                self.line_num += 1;
                // Line numbers are 1-based and the header occupies line 1.
                Some(
                    convert_op_record(record)
                        .map_err(|e| format!("Line {}: {}", self.line_num + 1, e)),
                )
            }
            Err(e) => {
                self.line_num += 1;
                Some(Err(format!(
                    "Line {}: CSV parse error: {}",
                    self.line_num + 1,
                    e
                )))
            }
        }
    }
}
