//! Error types for the FareWay ledger engine
//!
//! This module defines all error types that can occur during fare quoting,
//! wallet bookkeeping, fleet management, and replay processing.
//! Errors are designed to be descriptive and user-friendly for CLI output.
//!
//! # Error Categories
//!
//! - **Invalid input**: malformed amounts, person counts, missing fields
//! - **Not found**: unknown accounts, buses, conductors, routes
//! - **Business rule rejections**: insufficient funds (never silently clamped)
//! - **Transient I/O**: store unavailability or contention, eligible for retry
//!
//! Data-integrity events (ambiguous route matches, non-numeric stored fares,
//! orphaned tickets) are deliberately *not* errors: they are logged as
//! warnings and processing continues with a defined fallback.

use crate::store::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the fare ledger engine
///
/// This enum represents all possible errors that can occur during fare,
/// wallet, and fleet operations. Each variant includes relevant context
/// to help diagnose and resolve the issue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Amount is zero or negative where a positive amount is required
    ///
    /// This is a recoverable error - the credit/debit is rejected
    /// and the account state remains unchanged.
    #[error("Invalid amount {amount} for {operation}: must be positive")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
        /// Operation that rejected the amount
        operation: String,
    },

    /// Person count is zero where at least one passenger is required
    ///
    /// This is a recoverable error - the quote is rejected.
    #[error("Invalid person count {count}: must be at least 1")]
    InvalidPersonCount {
        /// The rejected count
        count: u32,
    },

    /// A required field is missing or malformed
    ///
    /// This is a recoverable error - the record is skipped
    /// and processing continues.
    #[error("Invalid field '{field}': {message}")]
    InvalidField {
        /// Name of the offending field
        field: String,
        /// Description of what was wrong
        message: String,
    },

    /// No wallet account exists for the given id
    ///
    /// This is a recoverable error - the debit/read is rejected.
    /// Accounts are provisioned through their first top-up.
    #[error("Account '{account}' not found")]
    AccountNotFound {
        /// The unknown account id
        account: String,
    },

    /// No bus is registered under the given number
    #[error("Bus '{bus_number}' not found")]
    BusNotFound {
        /// The unknown bus number
        bus_number: String,
    },

    /// No bus assignment exists for the given conductor
    #[error("Conductor '{conductor}' has no bus assignment")]
    ConductorNotFound {
        /// The conductor principal id
        conductor: String,
    },

    /// No route is registered under the given route number
    #[error("Route '{route_number}' not found")]
    RouteNotFound {
        /// The unknown route number
        route_number: String,
    },

    /// No route serves the requested trip
    ///
    /// Returned when the pickup, destination, or service type is
    /// unset/placeholder, or when no route matches in either direction.
    #[error("No {service_type} route between '{pickup}' and '{destination}'")]
    NoMatchingRoute {
        /// Requested pickup location
        pickup: String,
        /// Requested destination location
        destination: String,
        /// Requested service tier
        service_type: String,
    },

    /// Ticket issuance was requested but no route table was loaded
    ///
    /// This is a fatal configuration error for the replay tool.
    #[error("Route table missing: ticket issuance requires --routes")]
    RouteTableMissing,

    /// Insufficient balance for a debit or payout
    ///
    /// This is a recoverable error - the debit is rejected whole
    /// (no partial debit) and the account state remains unchanged.
    #[error(
        "Insufficient funds for account '{account}': available {available}, requested {requested}"
    )]
    InsufficientFunds {
        /// Account id
        account: String,
        /// Available balance
        available: Decimal,
        /// Requested debit amount
        requested: Decimal,
    },

    /// A referenced document was missing from the store
    ///
    /// This is a recoverable error carrying the raw store location;
    /// callers that know the domain object map it to a more specific
    /// not-found variant.
    #[error("Document '{id}' not found in collection '{collection}'")]
    DocumentNotFound {
        /// Collection name
        collection: String,
        /// Document id
        id: String,
    },

    /// Arithmetic overflow would occur
    ///
    /// This is a recoverable error - the operation is rejected
    /// to maintain balance integrity.
    #[error("Arithmetic overflow in {operation} for account '{account}'")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account id
        account: String,
    },

    /// Store unavailability or exhausted CAS retries
    ///
    /// Eligible for caller-initiated retry; never silently swallowed.
    #[error("Transient failure in {operation}: {message}")]
    Transient {
        /// Operation that failed
        operation: String,
        /// Description of the failure
        message: String,
    },
}

// Conversion from store errors into the engine taxonomy:
// unavailability and contention are transient, missing documents map to
// the generic not-found variant.
impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable { message } => LedgerError::Transient {
                operation: "store".to_string(),
                message,
            },
            StoreError::Contention { collection, id } => LedgerError::Transient {
                operation: "compare_and_swap".to_string(),
                message: format!("contention on '{}/{}'", collection, id),
            },
            StoreError::NotFound { collection, id } => {
                LedgerError::DocumentNotFound { collection, id }
            }
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal, operation: &str) -> Self {
        LedgerError::InvalidAmount {
            amount,
            operation: operation.to_string(),
        }
    }

    /// Create an InvalidField error
    pub fn invalid_field(field: &str, message: &str) -> Self {
        LedgerError::InvalidField {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(account: &str) -> Self {
        LedgerError::AccountNotFound {
            account: account.to_string(),
        }
    }

    /// Create a BusNotFound error
    pub fn bus_not_found(bus_number: &str) -> Self {
        LedgerError::BusNotFound {
            bus_number: bus_number.to_string(),
        }
    }

    /// Create a ConductorNotFound error
    pub fn conductor_not_found(conductor: &str) -> Self {
        LedgerError::ConductorNotFound {
            conductor: conductor.to_string(),
        }
    }

    /// Create a RouteNotFound error
    pub fn route_not_found(route_number: &str) -> Self {
        LedgerError::RouteNotFound {
            route_number: route_number.to_string(),
        }
    }

    /// Create a NoMatchingRoute error
    pub fn no_matching_route(pickup: &str, destination: &str, service_type: &str) -> Self {
        LedgerError::NoMatchingRoute {
            pickup: pickup.to_string(),
            destination: destination.to_string(),
            service_type: service_type.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: &str, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account: account.to_string(),
            available,
            requested,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account: account.to_string(),
        }
    }

    /// Create a Transient error
    pub fn transient(operation: &str, message: &str) -> Self {
        LedgerError::Transient {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether this error is eligible for caller-initiated retry
    ///
    /// Only transient store failures qualify; every other variant is a
    /// deterministic rejection that retrying cannot fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transient { .. })
    }
}
