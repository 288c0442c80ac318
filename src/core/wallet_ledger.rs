//! Wallet ledger: store-backed balance bookkeeping
//!
//! Per-account serialization is mandatory here. Every balance mutation
//! goes through a conditional compare-and-swap write: the delta is
//! applied only if the stored balance still matches the value read, and
//! the operation retries on conflict. Two concurrent debits of the same
//! account therefore can never both commit against the same stale
//! balance - the lost-update interleaving is impossible by construction.
//!
//! # Debit / Ticket Pairing
//!
//! A successful debit atomically pairs the balance decrement with an
//! appended ticket record. The store cannot commit both in one
//! transaction, so ordering makes the pair safe: the ticket is written
//! first, then the balance CAS. A committed debit is never observable
//! without its ticket. If the debit leg fails after the ticket was
//! appended, the ticket is deleted best-effort; when that cleanup itself
//! fails the orphaned ticket id is logged for reconciliation, since an
//! uncollected fare is less harmful than a double deduction.

use crate::store::{decimal_value, CasOutcome, Document, DocumentStore};
use crate::types::{DebitReceipt, LedgerError, TicketDraft, WalletAccount, TICKETS, WALLETS};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Bounded CAS retries before reporting contention as transient
///
/// Every conflict means some other writer committed, so system-wide
/// progress is guaranteed; a writer that loses this many races in a row
/// reports `Transient` and lets the caller decide whether to retry.
const CAS_ATTEMPTS: usize = 25;

/// Store-backed wallet ledger
///
/// Holds no state of its own; all balances live in the `wallets`
/// collection and all tickets in the `tickets` collection of the
/// document-store collaborator.
pub struct WalletLedger {
    store: Arc<dyn DocumentStore>,
}

impl WalletLedger {
    /// Create a ledger over the given document store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Read an account's balance along with its raw stored value
    ///
    /// The raw value is kept for CAS comparisons: re-encoding the
    /// decimal could normalize the text and never match the stored
    /// field again.
    async fn read_balance(&self, account_id: &str) -> Result<(Decimal, Value), LedgerError> {
        let doc = self
            .store
            .get(WALLETS, account_id)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(account_id))?;

        let raw = doc.get("balance").cloned().unwrap_or(Value::Null);
        let balance = decode_balance(&doc, account_id)?;
        Ok((balance, raw))
    }

    /// Read-only balance lookup
    ///
    /// Fails with `AccountNotFound` for unknown accounts; accounts are
    /// provisioned only through their first credit.
    pub async fn balance_of(&self, account_id: &str) -> Result<Decimal, LedgerError> {
        let (balance, _) = self.read_balance(account_id).await?;
        Ok(balance)
    }

    /// Credit (top up) an account, provisioning it on first use
    ///
    /// Fails with `InvalidAmount` when the amount is not positive.
    /// Racing provisions of the same account resolve through the
    /// store's create primitive, so neither credit is lost.
    ///
    /// Returns the new balance.
    pub async fn credit(&self, account_id: &str, amount: Decimal) -> Result<Decimal, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(amount, "credit"));
        }

        for _ in 0..CAS_ATTEMPTS {
            match self.store.get(WALLETS, account_id).await? {
                None => {
                    let doc = WalletAccount::document_with_balance(amount);
                    if self.store.create(WALLETS, account_id, doc).await? {
                        return Ok(amount);
                    }
                    // Lost the provisioning race; retry against the
                    // winner's document.
                }
                Some(doc) => {
                    let raw = doc.get("balance").cloned().unwrap_or(Value::Null);
                    let balance = decode_balance(&doc, account_id)?;
                    let new_balance = balance
                        .checked_add(amount)
                        .ok_or_else(|| LedgerError::arithmetic_overflow("credit", account_id))?;

                    match self
                        .store
                        .compare_and_swap(
                            WALLETS,
                            account_id,
                            "balance",
                            &raw,
                            decimal_value(new_balance),
                        )
                        .await?
                    {
                        CasOutcome::Applied => return Ok(new_balance),
                        CasOutcome::Conflict { .. } | CasOutcome::Missing => continue,
                    }
                }
            }
        }

        Err(LedgerError::transient("credit", "CAS retries exhausted"))
    }

    /// Debit an account and append the paired ticket
    ///
    /// Fails with `InvalidAmount` when the amount is not positive,
    /// `AccountNotFound` when no such account exists, and
    /// `InsufficientFunds` when the balance cannot cover the amount -
    /// all-or-nothing, no partial debit, no ticket kept.
    ///
    /// The ticket is written before the balance CAS (see module docs);
    /// the debited amount is recorded as the ticket's fare.
    pub async fn debit(
        &self,
        account_id: &str,
        amount: Decimal,
        draft: TicketDraft,
    ) -> Result<DebitReceipt, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(amount, "debit"));
        }

        // First read doubles as the existence and pre-funding check, so
        // no ticket is written for an account that plainly cannot pay.
        let (mut balance, mut expected) = self.read_balance(account_id).await?;
        if balance < amount {
            return Err(LedgerError::insufficient_funds(account_id, balance, amount));
        }

        let ticket_id = self.store.insert(TICKETS, draft.into_document(amount)).await?;

        for _ in 0..CAS_ATTEMPTS {
            if balance < amount {
                self.retract_ticket(&ticket_id, account_id).await;
                return Err(LedgerError::insufficient_funds(account_id, balance, amount));
            }

            let new_balance = match balance.checked_sub(amount) {
                Some(v) => v,
                None => {
                    self.retract_ticket(&ticket_id, account_id).await;
                    return Err(LedgerError::arithmetic_overflow("debit", account_id));
                }
            };

            let outcome = self
                .store
                .compare_and_swap(
                    WALLETS,
                    account_id,
                    "balance",
                    &expected,
                    decimal_value(new_balance),
                )
                .await;

            match outcome {
                Ok(CasOutcome::Applied) => {
                    return Ok(DebitReceipt {
                        ticket_id,
                        new_balance,
                    })
                }
                Ok(CasOutcome::Conflict { current }) => {
                    // Another writer committed; re-evaluate against the
                    // balance it left behind.
                    match decode_raw_balance(&current) {
                        Some(v) => {
                            balance = v;
                            expected = current;
                        }
                        None => {
                            self.retract_ticket(&ticket_id, account_id).await;
                            return Err(LedgerError::invalid_field(
                                "balance",
                                "stored balance is not numeric",
                            ));
                        }
                    }
                }
                Ok(CasOutcome::Missing) => {
                    self.retract_ticket(&ticket_id, account_id).await;
                    return Err(LedgerError::account_not_found(account_id));
                }
                Err(e) => {
                    self.retract_ticket(&ticket_id, account_id).await;
                    return Err(e.into());
                }
            }
        }

        self.retract_ticket(&ticket_id, account_id).await;
        Err(LedgerError::transient("debit", "CAS retries exhausted"))
    }

    /// Transfer the full balance out of an account
    ///
    /// Soft-zeroes the balance via CAS; the account document is never
    /// deleted. Fails with `InvalidAmount` when the balance is already
    /// zero (there is nothing to transfer).
    ///
    /// Returns the transferred amount.
    pub async fn payout(&self, account_id: &str) -> Result<Decimal, LedgerError> {
        for _ in 0..CAS_ATTEMPTS {
            let (balance, expected) = self.read_balance(account_id).await?;
            if balance == Decimal::ZERO {
                return Err(LedgerError::invalid_amount(balance, "payout"));
            }

            match self
                .store
                .compare_and_swap(
                    WALLETS,
                    account_id,
                    "balance",
                    &expected,
                    decimal_value(Decimal::ZERO),
                )
                .await?
            {
                CasOutcome::Applied => return Ok(balance),
                CasOutcome::Conflict { .. } => continue,
                CasOutcome::Missing => return Err(LedgerError::account_not_found(account_id)),
            }
        }

        Err(LedgerError::transient("payout", "CAS retries exhausted"))
    }

    /// Best-effort removal of a ticket whose debit leg failed
    ///
    /// A failed cleanup leaves the orphan in place and logs it for
    /// reconciliation.
    async fn retract_ticket(&self, ticket_id: &str, account_id: &str) {
        if let Err(e) = self.store.delete(TICKETS, ticket_id).await {
            warn!(
                ticket_id,
                account = account_id,
                error = %e,
                "failed to remove ticket after failed debit; leaving orphan for reconciliation"
            );
        }
    }
}

/// Decode the balance field of a wallet document
fn decode_balance(doc: &Document, account_id: &str) -> Result<Decimal, LedgerError> {
    WalletAccount::from_document(account_id, doc)
        .map(|w| w.balance)
        .ok_or_else(|| LedgerError::invalid_field("balance", "stored balance is not numeric"))
}

/// Decode a raw balance value as reported by a CAS conflict
fn decode_raw_balance(value: &Value) -> Option<Decimal> {
    value.as_str().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ledger() -> (WalletLedger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (WalletLedger::new(store.clone()), store)
    }

    fn draft() -> TicketDraft {
        TicketDraft {
            bus_number: "NB-1234".to_string(),
            route_number: None,
            person_count: Some(1),
            passenger: Some("p-1".to_string()),
            created_at: None,
        }
    }

    async fn ticket_count(store: &MemoryStore) -> usize {
        store.query(TICKETS, &[], None).await.unwrap().len()
    }

    #[tokio::test]
    async fn test_credit_provisions_account_on_first_topup() {
        let (ledger, _store) = ledger();

        let balance = ledger.credit("p-1", dec("100.00")).await.unwrap();
        assert_eq!(balance, dec("100.00"));
        assert_eq!(ledger.balance_of("p-1").await.unwrap(), dec("100.00"));
    }

    #[tokio::test]
    async fn test_credit_accumulates() {
        let (ledger, _store) = ledger();
        ledger.credit("p-1", dec("100.00")).await.unwrap();

        let balance = ledger.credit("p-1", dec("50.50")).await.unwrap();
        assert_eq!(balance, dec("150.50"));
    }

    #[rstest]
    #[case::zero("0")]
    #[case::negative("-10.00")]
    #[tokio::test]
    async fn test_credit_rejects_non_positive_amount(#[case] amount: &str) {
        let (ledger, _store) = ledger();
        let result = ledger.credit("p-1", dec(amount)).await;
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[tokio::test]
    async fn test_balance_of_unknown_account() {
        let (ledger, _store) = ledger();
        let result = ledger.balance_of("ghost").await;
        assert_eq!(result, Err(LedgerError::account_not_found("ghost")));
    }

    #[tokio::test]
    async fn test_debit_reduces_balance_and_appends_ticket() {
        let (ledger, store) = ledger();
        ledger.credit("p-1", dec("500.00")).await.unwrap();

        let receipt = ledger.debit("p-1", dec("450.00"), draft()).await.unwrap();
        assert_eq!(receipt.new_balance, dec("50.00"));

        // The ticket must exist and record the debited amount as fare.
        let ticket_doc = store
            .get(TICKETS, &receipt.ticket_id)
            .await
            .unwrap()
            .unwrap();
        let ticket = crate::types::TicketRecord::from_document(&receipt.ticket_id, &ticket_doc)
            .unwrap();
        assert_eq!(ticket.fare, Some(dec("450.00")));
        assert_eq!(ticket.passenger.as_deref(), Some("p-1"));
    }

    #[tokio::test]
    async fn test_debit_insufficient_funds_leaves_no_trace() {
        let (ledger, store) = ledger();
        ledger.credit("p-1", dec("1000")).await.unwrap();

        let result = ledger.debit("p-1", dec("1350"), draft()).await;
        assert_eq!(
            result,
            Err(LedgerError::insufficient_funds(
                "p-1",
                dec("1000"),
                dec("1350")
            ))
        );

        // No partial effect: balance unchanged and no ticket written.
        assert_eq!(ledger.balance_of("p-1").await.unwrap(), dec("1000"));
        assert_eq!(ticket_count(&store).await, 0);
    }

    #[tokio::test]
    async fn test_debit_after_topup_covers_fare() {
        // Balance 1000: debit 1350 rejected; credit 500 -> 1500;
        // debit 1350 succeeds leaving 150.00.
        let (ledger, store) = ledger();
        ledger.credit("p-1", dec("1000")).await.unwrap();

        assert!(ledger.debit("p-1", dec("1350"), draft()).await.is_err());

        let after_topup = ledger.credit("p-1", dec("500")).await.unwrap();
        assert_eq!(after_topup, dec("1500"));

        let receipt = ledger.debit("p-1", dec("1350"), draft()).await.unwrap();
        assert_eq!(receipt.new_balance, dec("150"));
        assert_eq!(ticket_count(&store).await, 1);
    }

    #[tokio::test]
    async fn test_credit_debit_round_trip_restores_balance() {
        let (ledger, _store) = ledger();
        ledger.credit("p-1", dec("75.25")).await.unwrap();

        ledger.credit("p-1", dec("20.00")).await.unwrap();
        let receipt = ledger.debit("p-1", dec("20.00"), draft()).await.unwrap();

        assert_eq!(receipt.new_balance, dec("75.25"));
    }

    #[tokio::test]
    async fn test_debit_unknown_account() {
        let (ledger, store) = ledger();
        let result = ledger.debit("ghost", dec("10"), draft()).await;
        assert_eq!(result, Err(LedgerError::account_not_found("ghost")));
        assert_eq!(ticket_count(&store).await, 0);
    }

    #[rstest]
    #[case::zero("0")]
    #[case::negative("-1")]
    #[tokio::test]
    async fn test_debit_rejects_non_positive_amount(#[case] amount: &str) {
        let (ledger, _store) = ledger();
        let result = ledger.debit("p-1", dec(amount), draft()).await;
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[tokio::test]
    async fn test_payout_transfers_and_soft_zeroes() {
        let (ledger, store) = ledger();
        ledger.credit("owner-1", dec("8250.75")).await.unwrap();

        let transferred = ledger.payout("owner-1").await.unwrap();
        assert_eq!(transferred, dec("8250.75"));

        // Soft-zeroed, not deleted.
        assert_eq!(ledger.balance_of("owner-1").await.unwrap(), Decimal::ZERO);
        assert!(store.get(WALLETS, "owner-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_payout_of_empty_wallet_is_rejected() {
        let (ledger, _store) = ledger();
        ledger.credit("owner-1", dec("10")).await.unwrap();
        ledger.payout("owner-1").await.unwrap();

        let result = ledger.payout("owner-1").await;
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_debits_never_overdraw() {
        // 20 concurrent debits of 0.1 against a 1.0 balance: exactly 10
        // must succeed and 10 must be rejected, final balance 0.
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(WalletLedger::new(
            store.clone() as Arc<dyn DocumentStore>
        ));
        ledger.credit("p-1", dec("1.0")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.debit("p-1", dec("0.1"), draft()).await
            }));
        }

        let mut succeeded = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(LedgerError::InsufficientFunds { .. }) => rejected += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(rejected, 10);
        assert_eq!(ledger.balance_of("p-1").await.unwrap(), Decimal::ZERO);
        // Every committed debit left its ticket, and only those.
        assert_eq!(ticket_count(&store).await, 10);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_credits_all_land() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(WalletLedger::new(
            store.clone() as Arc<dyn DocumentStore>
        ));

        // Racing first top-ups: the provisioning race must not lose
        // either credit.
        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(
                async move { ledger.credit("p-1", dec("5")).await },
            ));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(ledger.balance_of("p-1").await.unwrap(), dec("50"));
    }
}
