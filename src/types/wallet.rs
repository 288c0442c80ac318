//! Wallet account types and document codec
//!
//! A wallet holds a passenger's stored-value balance. Wallet documents
//! live in the `wallets` collection keyed by account id, with the balance
//! encoded as a decimal string (see the store module's field codecs).

use crate::store::{decimal_field, decimal_value, Document};
use rust_decimal::Decimal;

/// Name of the wallet collection in the document store
pub const WALLETS: &str = "wallets";

/// A passenger's stored-value account
///
/// Invariant: the balance never goes negative. Accounts are provisioned
/// on first top-up and never deleted; a payout soft-zeroes the balance
/// instead.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletAccount {
    /// Owning principal's id
    pub account_id: String,

    /// Current stored-value balance, in rupees
    pub balance: Decimal,
}

impl WalletAccount {
    /// Decode a wallet from its stored document
    ///
    /// Returns None when the balance field is missing or non-numeric,
    /// which would indicate a corrupted wallet document.
    pub fn from_document(account_id: &str, doc: &Document) -> Option<Self> {
        Some(Self {
            account_id: account_id.to_string(),
            balance: decimal_field(doc, "balance")?,
        })
    }

    /// Encode a fresh wallet document with the given balance
    pub fn document_with_balance(balance: Decimal) -> Document {
        let mut doc = Document::new();
        doc.insert("balance".to_string(), decimal_value(balance));
        doc
    }
}

/// Receipt returned by a successful wallet debit
///
/// Carries the id of the ticket that was appended atomically with the
/// balance decrement, so the caller can hand it to the passenger.
#[derive(Debug, Clone, PartialEq)]
pub struct DebitReceipt {
    /// Id of the appended ticket record
    pub ticket_id: String,

    /// Account balance after the debit
    pub new_balance: Decimal,
}
