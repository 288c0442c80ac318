//! I/O module
//!
//! Handles the replay tool's CSV surfaces.
//!
//! # Components
//!
//! - `csv_format` - record conversion, route-table loading, report output
//! - `sync_reader` - synchronous reader with iterator interface
//! - `async_reader` - asynchronous reader with batch interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_op_record, load_route_index, write_balances_csv, write_rollups_csv, OpCsvRecord,
};
pub use sync_reader::SyncReader;
