//! In-memory document store
//!
//! `MemoryStore` implements the [`DocumentStore`] collaborator trait over
//! nested `DashMap`s, one inner map per collection. It serves two roles:
//! the test double for every store-backed component, and the backend the
//! offline replay tool runs against.
//!
//! # Thread Safety
//!
//! DashMap provides fine-grained locking per entry. The compare-and-swap
//! implementation performs its comparison and write while holding the
//! entry lock, so concurrent CAS attempts against the same document
//! serialize correctly - at most one of two racing writers observes a
//! matching expected value.

use crate::store::{
    CasOutcome, ChangeEvent, ChangeFeed, ChangeKind, Document, DocumentStore, Filter, OrderBy,
    StoreError,
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity of the change-feed broadcast channel
///
/// Slow subscribers that fall more than this many events behind observe
/// a lag error and are expected to re-query a fresh snapshot.
const CHANGE_FEED_CAPACITY: usize = 256;

/// In-memory document store backed by nested DashMaps
///
/// Collections are created lazily on first access. All operations are
/// thread-safe; operations on different documents proceed in parallel
/// while operations on the same document are serialized by the entry
/// lock.
#[derive(Debug)]
pub struct MemoryStore {
    /// Collection name to per-collection document map
    collections: DashMap<String, Arc<DashMap<String, Document>>>,
    /// Broadcast sender for the change feed (receivers may not exist)
    feed: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    /// Create a new empty MemoryStore
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            collections: DashMap::new(),
            feed,
        }
    }

    /// Get or lazily create the map for a collection
    ///
    /// Returns a clone of the Arc so the outer map's shard lock is not
    /// held while the caller operates on the inner map.
    fn collection(&self, name: &str) -> Arc<DashMap<String, Document>> {
        self.collections
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Publish a change event, ignoring the no-subscriber case
    fn emit(&self, collection: &str, id: &str, kind: ChangeKind) {
        let _ = self.feed.send(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare two JSON values for ordering purposes
///
/// Numbers compare numerically, strings lexicographically; mixed or
/// non-comparable kinds fall back to their serialized form so the sort
/// stays total and deterministic.
fn value_cmp(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => match (a.as_str(), b.as_str()) {
            (Some(x), Some(y)) => x.cmp(y),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let coll = self.collection(collection);
        Ok(coll.get(id).map(|entry| entry.clone()))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> Result<(), StoreError> {
        let coll = self.collection(collection);

        let kind = if merge {
            if let Some(mut existing) = coll.get_mut(id) {
                for (key, value) in fields {
                    existing.insert(key, value);
                }
                ChangeKind::Modified
            } else {
                coll.insert(id.to_string(), fields);
                ChangeKind::Added
            }
        } else if coll.insert(id.to_string(), fields).is_some() {
            ChangeKind::Modified
        } else {
            ChangeKind::Added
        };

        self.emit(collection, id, kind);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        let coll = self.collection(collection);

        match coll.get_mut(id) {
            Some(mut existing) => {
                for (key, value) in fields {
                    existing.insert(key, value);
                }
            }
            None => {
                return Err(StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })
            }
        }

        self.emit(collection, id, ChangeKind::Modified);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let coll = self.collection(collection);

        if coll.remove(id).is_some() {
            self.emit(collection, id, ChangeKind::Removed);
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        let coll = self.collection(collection);

        let id = Uuid::new_v4().to_string();
        coll.insert(id.clone(), fields);
        self.emit(collection, &id, ChangeKind::Added);
        Ok(id)
    }

    async fn create(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<bool, StoreError> {
        let coll = self.collection(collection);

        // The entry lock makes check-then-insert atomic, so two racing
        // creates resolve to exactly one winner.
        let mut created = false;
        let entry = coll.entry(id.to_string()).or_insert_with(|| {
            created = true;
            fields
        });
        drop(entry);

        if created {
            self.emit(collection, id, ChangeKind::Added);
        }
        Ok(created)
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<OrderBy>,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let coll = self.collection(collection);

        let mut results: Vec<(String, Document)> = coll
            .iter()
            .filter(|entry| filters.iter().all(|f| f.matches(entry.value())))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        if let Some(order) = order {
            results.sort_by(|(_, a), (_, b)| {
                let av = a.get(&order.field).unwrap_or(&Value::Null);
                let bv = b.get(&order.field).unwrap_or(&Value::Null);
                let cmp = value_cmp(av, bv);
                if order.descending {
                    cmp.reverse()
                } else {
                    cmp
                }
            });
        }

        Ok(results)
    }

    async fn compare_and_swap(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        new: Value,
    ) -> Result<CasOutcome, StoreError> {
        let coll = self.collection(collection);

        let outcome = match coll.get_mut(id) {
            None => CasOutcome::Missing,
            Some(mut doc) => {
                // Comparison and write happen under the entry lock.
                let current = doc.get(field).cloned().unwrap_or(Value::Null);
                if current == *expected {
                    doc.insert(field.to_string(), new);
                    CasOutcome::Applied
                } else {
                    CasOutcome::Conflict { current }
                }
            }
        };

        if outcome == CasOutcome::Applied {
            self.emit(collection, id, ChangeKind::Modified);
        }
        Ok(outcome)
    }
}

impl ChangeFeed for MemoryStore {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
