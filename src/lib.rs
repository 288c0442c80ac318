//! Fareway Ledger Library
//! # Overview
//!
//! Backend engine for a bus-ticketing system: route lookup and fare
//! quoting, prepaid wallet bookkeeping with ticket-paired debits, fleet
//! and conductor management, and daily revenue rollups. A CSV replay
//! tool drives the engine with both a sync and an async strategy.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (routes, tickets, wallets, replay operations)
//! - [`store`] - Document-store collaborator interface and in-memory implementation
//! - [`auth`] - Identity-provider collaborator interface
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::route_index`] / [`core::fare`] - bidirectional route lookup and fare quoting
//!   - [`core::wallet_ledger`] - CAS-serialized balance mutations paired with tickets
//!   - [`core::fleet`] - bus, route, and conductor registry
//!   - [`core::rollup`] - daily revenue and passenger aggregation
//!   - [`core::engine`] / [`core::batch`] - replay orchestration
//! - [`io`] - CSV input and report output with pluggable reading strategies
//! - [`strategy`] - sync and async replay pipelines
//!
//! # Money
//!
//! All monetary values are `rust_decimal::Decimal`. Fares are rounded
//! to 2 decimal places half-up at quote time; documents store amounts
//! as decimal strings to avoid float drift.

// Module declarations
pub mod auth;
pub mod cli;
pub mod core;
pub mod io;
pub mod store;
pub mod strategy;
pub mod types;

pub use core::{FleetDirectory, ReplayEngine, RouteIndex, WalletLedger};
pub use io::{write_balances_csv, write_rollups_csv};
pub use store::{DocumentStore, MemoryStore};
pub use types::{
    DailyRollup, FareQuote, LedgerError, ReplayOp, Route, TicketDraft, TicketRecord, TripRequest,
    WalletAccount,
};
