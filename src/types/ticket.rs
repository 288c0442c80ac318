//! Ticket types, rollups, and the ticket document codec
//!
//! Tickets are append-only ledger entries: written exactly once per
//! completed trip confirmation or wallet debit, immutable thereafter.
//! Two shapes share one collection - wallet-debit tickets carry the
//! paying passenger's account id, manually issued tickets carry trip
//! details but no passenger - so the decoder is deliberately lenient
//! about optional fields.

use crate::store::{
    count_field, decimal_field, decimal_value, string_field, timestamp_field, timestamp_value,
    Document,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

/// Name of the ticket collection in the document store
pub const TICKETS: &str = "tickets";

/// A persisted ticket record
///
/// The id is opaque and assigned by the persistence layer. `fare` is
/// optional at the type level because stored documents may carry a
/// missing or non-numeric fare; the revenue aggregator treats those as
/// zero and flags them as a data-quality event rather than failing.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRecord {
    /// Store-assigned opaque id
    pub id: String,

    /// Number of the bus the trip was taken on
    pub bus_number: String,

    /// Route number, when known at issuance
    pub route_number: Option<String>,

    /// Collected fare; None when the stored field is missing or
    /// non-numeric
    pub fare: Option<Decimal>,

    /// Passengers covered by this ticket; None on wallet-debit tickets
    /// that did not record a party size
    pub person_count: Option<u32>,

    /// Paying passenger's account id; None on manually issued tickets
    pub passenger: Option<String>,

    /// Issuance time
    pub created_at: DateTime<Utc>,
}

impl TicketRecord {
    /// Decode a ticket from its stored document
    ///
    /// Returns None only when the document lacks a bus number or
    /// timestamp - without those the record cannot participate in any
    /// rollup. A bad fare decodes as `fare: None` so the ticket still
    /// counts.
    pub fn from_document(id: &str, doc: &Document) -> Option<Self> {
        Some(Self {
            id: id.to_string(),
            bus_number: string_field(doc, "bus_number")?,
            route_number: string_field(doc, "route_number"),
            fare: decimal_field(doc, "fare"),
            person_count: count_field(doc, "person_count"),
            passenger: string_field(doc, "passenger"),
            created_at: timestamp_field(doc, "created_at")?,
        })
    }
}

/// The caller-supplied part of a ticket, before persistence
///
/// The fare and final timestamp are filled in at append time: the
/// wallet ledger records the debited amount as the fare, and a draft
/// without an explicit timestamp is stamped with the current time.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketDraft {
    /// Number of the bus the trip is taken on
    pub bus_number: String,

    /// Route number, when known at issuance
    pub route_number: Option<String>,

    /// Passengers covered by the ticket
    pub person_count: Option<u32>,

    /// Paying passenger's account id, for wallet-debit tickets
    pub passenger: Option<String>,

    /// Explicit issuance time; defaults to now when absent
    pub created_at: Option<DateTime<Utc>>,
}

impl TicketDraft {
    /// Encode the draft into a ticket document with the given fare
    pub fn into_document(self, fare: Decimal) -> Document {
        let mut doc = Document::new();
        doc.insert("bus_number".to_string(), Value::from(self.bus_number));
        if let Some(route_number) = self.route_number {
            doc.insert("route_number".to_string(), Value::from(route_number));
        }
        doc.insert("fare".to_string(), decimal_value(fare));
        if let Some(person_count) = self.person_count {
            doc.insert("person_count".to_string(), Value::from(person_count));
        }
        if let Some(passenger) = self.passenger {
            doc.insert("passenger".to_string(), Value::from(passenger));
        }
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        doc.insert("created_at".to_string(), timestamp_value(created_at));
        doc
    }
}

/// Aggregated revenue and passenger counts over one day window
///
/// Derived, never persisted: recomputed from a scan of ticket records
/// within `[window_start, window_start + 24h)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRollup {
    /// Start of the half-open day window
    pub window_start: DateTime<Utc>,

    /// Number of tickets issued in the window
    pub ticket_count: u32,

    /// Sum of per-ticket person counts (missing counted as 0)
    pub passenger_count: u32,

    /// Sum of collected fares (missing counted as 0)
    pub total_fare: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_draft() -> TicketDraft {
        TicketDraft {
            bus_number: "NB-1234".to_string(),
            route_number: Some("EX1-22".to_string()),
            person_count: Some(3),
            passenger: Some("p-1".to_string()),
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_draft_document_round_trips() {
        let fare = Decimal::new(135000, 2);
        let doc = sample_draft().into_document(fare);
        let ticket = TicketRecord::from_document("t-1", &doc).unwrap();

        assert_eq!(ticket.bus_number, "NB-1234");
        assert_eq!(ticket.route_number.as_deref(), Some("EX1-22"));
        assert_eq!(ticket.fare, Some(fare));
        assert_eq!(ticket.person_count, Some(3));
        assert_eq!(ticket.passenger.as_deref(), Some("p-1"));
        assert_eq!(
            ticket.created_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_draft_without_timestamp_is_stamped() {
        let mut draft = sample_draft();
        draft.created_at = None;
        let before = Utc::now();

        let doc = draft.into_document(Decimal::new(100, 0));
        let ticket = TicketRecord::from_document("t-1", &doc).unwrap();

        assert!(ticket.created_at >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn test_decode_tolerates_non_numeric_fare() {
        let mut doc = sample_draft().into_document(Decimal::ZERO);
        doc.insert("fare".to_string(), Value::from("forty rupees"));

        let ticket = TicketRecord::from_document("t-1", &doc).unwrap();
        assert_eq!(ticket.fare, None);
    }

    #[test]
    fn test_decode_requires_bus_and_timestamp() {
        let full = sample_draft().into_document(Decimal::ZERO);

        let mut without_bus = full.clone();
        without_bus.remove("bus_number");
        assert!(TicketRecord::from_document("t-1", &without_bus).is_none());

        let mut without_timestamp = full;
        without_timestamp.remove("created_at");
        assert!(TicketRecord::from_document("t-1", &without_timestamp).is_none());
    }

    #[test]
    fn test_decode_minimal_manual_ticket() {
        let mut doc = Document::new();
        doc.insert("bus_number".to_string(), Value::from("NB-9"));
        doc.insert("created_at".to_string(), timestamp_value(Utc::now()));

        let ticket = TicketRecord::from_document("t-1", &doc).unwrap();
        assert_eq!(ticket.fare, None);
        assert_eq!(ticket.person_count, None);
        assert_eq!(ticket.passenger, None);
    }
}
