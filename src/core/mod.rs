//! Core ledger components
//!
//! The fare calculator and route index are pure and synchronous; the
//! wallet ledger, fleet directory, and replay engine are async and talk
//! to the document-store collaborator. [`BatchProcessor`] parallelizes
//! replay across partition keys on top of the engine.

pub mod batch;
pub mod engine;
pub mod fare;
pub mod fleet;
pub mod rollup;
pub mod route_index;
pub mod wallet_ledger;

pub use batch::{BatchProcessor, ReplayResult};
pub use engine::ReplayEngine;
pub use fare::{is_placeholder, quote};
pub use fleet::{Bus, ConductorAssignment, FleetDirectory, FleetStats, BUSES, CONDUCTORS, ROUTES};
pub use rollup::{aggregate, day_window, passenger_change, percent_change};
pub use route_index::RouteIndex;
pub use wallet_ledger::WalletLedger;
