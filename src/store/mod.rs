//! Document-store collaborator interface
//!
//! The fare ledger engine never talks to a concrete backend directly; all
//! persistence goes through the [`DocumentStore`] trait defined here. The
//! trait mirrors the operation shapes of a managed document database:
//! get/set/update/delete by key, insert with a store-assigned id, filtered
//! queries, and a conditional compare-and-swap write used to serialize
//! per-account balance mutations.
//!
//! Change notification is a separate capability ([`ChangeFeed`]) rather than
//! part of the core trait: consumers receive change events and re-query
//! snapshots, so aggregation logic stays a pure function over a snapshot
//! regardless of whether it arrived via push or pull.
//!
//! # Document Encoding
//!
//! Documents are schemaless JSON maps. Two conventions keep queries sane:
//! - Money fields encode as decimal strings, so no precision is lost.
//! - Timestamps encode as epoch milliseconds (numeric), so range filters
//!   order correctly and half-open time windows work.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::broadcast;

/// A stored document: an ordered map of field name to JSON value
pub type Document = serde_json::Map<String, Value>;

/// Errors surfaced by a document-store collaborator
///
/// These are collaborator-level failures; `From<StoreError> for LedgerError`
/// maps them into the engine taxonomy (transient vs. not-found).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the operation
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Description of the failure
        message: String,
    },

    /// A conditional write kept losing the race after bounded retries
    #[error("Contention on '{collection}/{id}'")]
    Contention {
        /// Collection name
        collection: String,
        /// Document id
        id: String,
    },

    /// The referenced document does not exist
    #[error("Document '{id}' not found in collection '{collection}'")]
    NotFound {
        /// Collection name
        collection: String,
        /// Document id
        id: String,
    },
}

/// Query filter over a single document field
///
/// `Ge`/`Lt` compare numerically against epoch-millisecond timestamps,
/// which is what makes half-open time windows (`Ge(start)` + `Lt(end)`)
/// expressible as a store query.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the given value exactly
    Eq {
        /// Field name
        field: String,
        /// Value to compare against
        value: Value,
    },
    /// Numeric field is greater than or equal to the given value
    Ge {
        /// Field name
        field: String,
        /// Inclusive lower bound
        value: i64,
    },
    /// Numeric field is strictly less than the given value
    Lt {
        /// Field name
        field: String,
        /// Exclusive upper bound
        value: i64,
    },
}

impl Filter {
    /// Equality filter on a string field
    pub fn eq_str(field: &str, value: &str) -> Self {
        Filter::Eq {
            field: field.to_string(),
            value: Value::String(value.to_string()),
        }
    }

    /// Whether the given document satisfies this filter
    ///
    /// Missing fields never match; a range filter over a non-numeric
    /// field never matches either.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq { field, value } => doc.get(field) == Some(value),
            Filter::Ge { field, value } => doc
                .get(field)
                .and_then(Value::as_i64)
                .map(|v| v >= *value)
                .unwrap_or(false),
            Filter::Lt { field, value } => doc
                .get(field)
                .and_then(Value::as_i64)
                .map(|v| v < *value)
                .unwrap_or(false),
        }
    }
}

/// Result ordering for a query
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Field to order by
    pub field: String,
    /// Sort descending instead of ascending
    pub descending: bool,
}

impl OrderBy {
    /// Ascending order on the given field
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }
}

/// Outcome of a compare-and-swap write
///
/// This is the serialization primitive the wallet ledger builds on:
/// a balance delta is applied only if the stored value still matches
/// what the caller read, so two concurrent debits can never both commit
/// against the same stale balance.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The expected value matched and the new value was written
    Applied,
    /// The stored value no longer matches; carries the current value
    Conflict {
        /// The value currently stored in the field
        current: Value,
    },
    /// The document does not exist
    Missing,
}

/// A change event emitted by a store's change feed
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Collection the change occurred in
    pub collection: String,
    /// Id of the changed document
    pub id: String,
    /// What kind of change occurred
    pub kind: ChangeKind,
}

/// Kind of document change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A new document was created
    Added,
    /// An existing document was updated
    Modified,
    /// A document was deleted
    Removed,
}

/// Document-store collaborator trait
///
/// All operations are asynchronous and may suspend awaiting a network
/// round trip. Implementations must tolerate cancellation: a future
/// dropped mid-operation either committed already or never started its
/// committal write - no partial effect may remain.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id, or None if it does not exist
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Write a document under the given id
    ///
    /// With `merge` set, fields are merged into any existing document;
    /// otherwise the document is replaced whole. Creates the document
    /// if it does not exist.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Merge fields into an existing document
    ///
    /// Fails with `NotFound` when the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Document)
        -> Result<(), StoreError>;

    /// Delete a document by id (no-op if it does not exist)
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Insert a document under a store-assigned opaque id
    ///
    /// Returns the assigned id.
    async fn insert(&self, collection: &str, fields: Document) -> Result<String, StoreError>;

    /// Create a document only if no document exists under the id
    ///
    /// Returns false (without writing) when the document already exists.
    /// This is the provisioning-race primitive: two racing first top-ups
    /// resolve to exactly one creation.
    async fn create(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<bool, StoreError>;

    /// Query documents matching all filters, optionally ordered
    ///
    /// Returns (id, document) pairs. An unordered query returns documents
    /// in unspecified order.
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<OrderBy>,
    ) -> Result<Vec<(String, Document)>, StoreError>;

    /// Conditionally replace a single field
    ///
    /// Writes `new` into `field` only if the stored value equals
    /// `expected` (a missing field compares as JSON null). The comparison
    /// and write are atomic with respect to all other writes to the same
    /// document.
    async fn compare_and_swap(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        new: Value,
    ) -> Result<CasOutcome, StoreError>;
}

/// Change-notification capability
///
/// Separate from [`DocumentStore`] so the core engine can depend on the
/// pull-based snapshot interface alone. Consumers that want liveness
/// subscribe here and re-query on events.
pub trait ChangeFeed: Send + Sync {
    /// Subscribe to all document changes
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

// Field codecs. Money travels as decimal strings, timestamps as epoch
// milliseconds; everything below is the one place those conventions live.

/// Read a decimal field encoded as a string
pub fn decimal_field(doc: &Document, field: &str) -> Option<Decimal> {
    doc.get(field)
        .and_then(Value::as_str)
        .and_then(|s| Decimal::from_str(s).ok())
}

/// Encode a decimal into a document field value
pub fn decimal_value(value: Decimal) -> Value {
    Value::String(value.to_string())
}

/// Read a timestamp field encoded as epoch milliseconds
pub fn timestamp_field(doc: &Document, field: &str) -> Option<DateTime<Utc>> {
    doc.get(field)
        .and_then(Value::as_i64)
        .and_then(DateTime::from_timestamp_millis)
}

/// Encode a timestamp into a document field value
pub fn timestamp_value(value: DateTime<Utc>) -> Value {
    Value::from(value.timestamp_millis())
}

/// Read a string field
pub fn string_field(doc: &Document, field: &str) -> Option<String> {
    doc.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Read a non-negative integer field
pub fn count_field(doc: &Document, field: &str) -> Option<u32> {
    doc.get(field)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn doc_with(field: &str, value: Value) -> Document {
        let mut doc = Document::new();
        doc.insert(field.to_string(), value);
        doc
    }

    #[rstest]
    #[case::eq_match(Filter::eq_str("bus", "NB-1"), doc_with("bus", Value::from("NB-1")), true)]
    #[case::eq_mismatch(Filter::eq_str("bus", "NB-1"), doc_with("bus", Value::from("NB-2")), false)]
    #[case::eq_missing_field(Filter::eq_str("bus", "NB-1"), Document::new(), false)]
    #[case::ge_inclusive(
        Filter::Ge { field: "at".to_string(), value: 1000 },
        doc_with("at", Value::from(1000)),
        true
    )]
    #[case::ge_below(
        Filter::Ge { field: "at".to_string(), value: 1000 },
        doc_with("at", Value::from(999)),
        false
    )]
    #[case::lt_exclusive(
        Filter::Lt { field: "at".to_string(), value: 1000 },
        doc_with("at", Value::from(1000)),
        false
    )]
    #[case::lt_below(
        Filter::Lt { field: "at".to_string(), value: 1000 },
        doc_with("at", Value::from(999)),
        true
    )]
    #[case::range_non_numeric(
        Filter::Ge { field: "at".to_string(), value: 0 },
        doc_with("at", Value::from("yesterday")),
        false
    )]
    fn test_filter_matches(#[case] filter: Filter, #[case] doc: Document, #[case] expected: bool) {
        assert_eq!(filter.matches(&doc), expected);
    }

    #[test]
    fn test_decimal_codec_is_exact() {
        let amount = Decimal::new(135050, 2); // 1350.50
        let doc = doc_with("fare", decimal_value(amount));
        assert_eq!(decimal_field(&doc, "fare"), Some(amount));
    }

    #[test]
    fn test_decimal_field_rejects_non_numeric() {
        let doc = doc_with("fare", Value::from("one hundred"));
        assert_eq!(decimal_field(&doc, "fare"), None);
    }

    #[test]
    fn test_timestamp_codec_round_trips_to_millis() {
        let now = Utc::now();
        let doc = doc_with("at", timestamp_value(now));
        let decoded = timestamp_field(&doc, "at").unwrap();
        assert_eq!(decoded.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_count_field_rejects_negative() {
        let doc = doc_with("persons", Value::from(-3));
        assert_eq!(count_field(&doc, "persons"), None);
    }
}
