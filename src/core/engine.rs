//! Replay engine: applies parsed operations against the ledger
//!
//! One engine instance is shared across replay workers; it owns no
//! mutable state of its own, so sharing is an `Arc` and per-account
//! serialization stays where it belongs, in the wallet ledger's CAS
//! writes.

use crate::core::fare;
use crate::core::rollup;
use crate::core::route_index::RouteIndex;
use crate::core::wallet_ledger::WalletLedger;
use crate::store::DocumentStore;
use crate::types::{
    DailyRollup, LedgerError, ReplayOp, TicketDraft, TicketRecord, TripRequest, WalletAccount,
    TICKETS, WALLETS,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Applies replay operations and produces reports
pub struct ReplayEngine {
    store: Arc<dyn DocumentStore>,
    ledger: WalletLedger,
    routes: Option<RouteIndex>,
}

impl ReplayEngine {
    /// Create an engine over a document store
    ///
    /// `routes` is the route table snapshot used to quote issuance
    /// operations; a run without one can still replay wallet operations
    /// but fails any `issue` row with `RouteTableMissing`.
    pub fn new(store: Arc<dyn DocumentStore>, routes: Option<RouteIndex>) -> Self {
        let ledger = WalletLedger::new(store.clone());
        Self {
            store,
            ledger,
            routes,
        }
    }

    /// Whether issuance operations can be quoted
    pub fn has_routes(&self) -> bool {
        self.routes.is_some()
    }

    /// Apply one replay operation
    pub async fn apply(&self, op: ReplayOp) -> Result<(), LedgerError> {
        match op {
            ReplayOp::TopUp {
                account, amount, ..
            } => {
                self.ledger.credit(&account, amount).await?;
                Ok(())
            }

            ReplayOp::Debit {
                account,
                amount,
                bus,
                persons,
                at,
            } => {
                let draft = TicketDraft {
                    bus_number: bus,
                    route_number: None,
                    person_count: persons,
                    passenger: Some(account.clone()),
                    created_at: at,
                };
                self.ledger.debit(&account, amount, draft).await?;
                Ok(())
            }

            ReplayOp::Issue {
                bus,
                pickup,
                destination,
                service,
                persons,
                at,
            } => {
                let routes = self.routes.as_ref().ok_or(LedgerError::RouteTableMissing)?;
                let request = TripRequest {
                    pickup,
                    destination,
                    service_type: service,
                    person_count: persons,
                };
                let quote = fare::quote(&request, routes)?;

                let draft = TicketDraft {
                    bus_number: bus,
                    route_number: Some(quote.matched_route_number.clone()),
                    person_count: Some(persons),
                    passenger: None,
                    created_at: at,
                };
                self.store
                    .insert(TICKETS, draft.into_document(quote.total_fare))
                    .await?;
                Ok(())
            }
        }
    }

    /// All wallet balances, sorted by account id
    pub async fn balances_report(&self) -> Result<Vec<(String, Decimal)>, LedgerError> {
        let docs = self.store.query(WALLETS, &[], None).await?;

        let mut balances = Vec::with_capacity(docs.len());
        for (id, doc) in docs {
            match WalletAccount::from_document(&id, &doc) {
                Some(wallet) => balances.push((wallet.account_id, wallet.balance)),
                None => warn!(account = %id, "wallet document has non-numeric balance; skipping"),
            }
        }
        balances.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(balances)
    }

    /// Per-day ticket rollups over every stored ticket, sorted by day
    pub async fn rollups_report(&self) -> Result<Vec<(NaiveDate, DailyRollup)>, LedgerError> {
        let docs = self.store.query(TICKETS, &[], None).await?;

        let mut by_day: BTreeMap<NaiveDate, Vec<TicketRecord>> = BTreeMap::new();
        for (id, doc) in docs {
            match TicketRecord::from_document(&id, &doc) {
                Some(ticket) => by_day
                    .entry(ticket.created_at.date_naive())
                    .or_default()
                    .push(ticket),
                None => warn!(ticket_id = %id, "ticket document missing required fields; skipping"),
            }
        }

        let mut rollups = Vec::with_capacity(by_day.len());
        for (day, tickets) in by_day {
            let (start, end) = rollup::day_window(day);
            rollups.push((day, rollup::aggregate(&tickets, start, end)));
        }
        Ok(rollups)
    }
}
