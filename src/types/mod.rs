//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `route`: Route records, trip requests, and fare quotes
//! - `wallet`: Wallet accounts and debit receipts
//! - `ticket`: Ticket records, drafts, and daily rollups
//! - `ops`: Parsed replay operations
//! - `error`: Error types for the fare ledger engine

pub mod error;
pub mod ops;
pub mod route;
pub mod ticket;
pub mod wallet;

pub use error::LedgerError;
pub use ops::ReplayOp;
pub use route::{FareQuote, Route, TripRequest};
pub use ticket::{DailyRollup, TicketDraft, TicketRecord, TICKETS};
pub use wallet::{DebitReceipt, WalletAccount, WALLETS};
