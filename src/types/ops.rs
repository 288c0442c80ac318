//! Replay operation types
//!
//! A replay operation is one parsed row of the replay tool's input CSV:
//! a wallet top-up, a wallet debit aboard a bus, or a manual ticket
//! issuance quoted against the route table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// One parsed replay operation
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOp {
    /// Credit a wallet account
    TopUp {
        /// Account to credit
        account: String,
        /// Amount to add (validated positive by the ledger)
        amount: Decimal,
        /// Optional explicit operation time
        at: Option<DateTime<Utc>>,
    },

    /// Debit a wallet account for a fare collected aboard a bus
    Debit {
        /// Account to debit
        account: String,
        /// Fare amount to collect
        amount: Decimal,
        /// Bus the fare was collected on
        bus: String,
        /// Party size, when recorded
        persons: Option<u32>,
        /// Optional explicit operation time
        at: Option<DateTime<Utc>>,
    },

    /// Issue a ticket manually, quoting the fare from the route table
    Issue {
        /// Bus the ticket is issued on
        bus: String,
        /// Boarding location
        pickup: String,
        /// Alighting location
        destination: String,
        /// Service tier
        service: String,
        /// Party size
        persons: u32,
        /// Optional explicit operation time
        at: Option<DateTime<Utc>>,
    },
}

impl ReplayOp {
    /// Key used to partition operations for parallel replay
    ///
    /// Wallet operations partition by account so per-account order is
    /// preserved; issuance has no account and partitions by bus.
    pub fn partition_key(&self) -> &str {
        match self {
            ReplayOp::TopUp { account, .. } => account,
            ReplayOp::Debit { account, .. } => account,
            ReplayOp::Issue { bus, .. } => bus,
        }
    }
}
