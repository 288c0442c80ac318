//! Fleet directory: buses, routes, and conductor assignments
//!
//! The store-backed registry the owner side of the system operates on.
//! It is the only component that mutates route records; the fare
//! calculator and conductors consume read-only [`RouteIndex`] snapshots
//! built here.

use crate::core::route_index::RouteIndex;
use crate::store::{
    count_field, decimal_field, decimal_value, string_field, Document, DocumentStore, Filter,
    OrderBy, StoreError,
};
use crate::types::{LedgerError, Route};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Name of the bus collection in the document store
pub const BUSES: &str = "buses";
/// Name of the route collection in the document store
pub const ROUTES: &str = "routes";
/// Name of the conductor-assignment collection in the document store
pub const CONDUCTORS: &str = "conductors";

/// A bus in an owner's fleet
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    /// Display name (e.g. "Kandy Express")
    pub name: String,
    /// Registration number, unique within the fleet
    pub number: String,
    /// Route the bus runs
    pub route_number: String,
    /// Seat count
    pub seats: u32,
    /// Contact phone number
    pub contact: String,
}

impl Bus {
    fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("name".to_string(), Value::from(self.name.clone()));
        doc.insert("number".to_string(), Value::from(self.number.clone()));
        doc.insert(
            "route_number".to_string(),
            Value::from(self.route_number.clone()),
        );
        doc.insert("seats".to_string(), Value::from(self.seats));
        doc.insert("contact".to_string(), Value::from(self.contact.clone()));
        doc
    }

    fn from_document(doc: &Document) -> Option<Self> {
        Some(Self {
            name: string_field(doc, "name")?,
            number: string_field(doc, "number")?,
            route_number: string_field(doc, "route_number")?,
            seats: count_field(doc, "seats").unwrap_or(0),
            contact: string_field(doc, "contact").unwrap_or_default(),
        })
    }
}

/// A conductor's bus assignment
#[derive(Debug, Clone, PartialEq)]
pub struct ConductorAssignment {
    /// Conductor principal id
    pub conductor: String,
    /// Assigned bus number
    pub bus_number: String,
    /// Whether the conductor is currently signed in
    pub active: bool,
}

/// Headline counts for the owner dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetStats {
    /// Buses registered in the fleet
    pub total_buses: u32,
    /// Conductors with an assignment
    pub total_conductors: u32,
    /// Conductors currently signed in
    pub active_conductors: u32,
}

/// Store-backed fleet registry
pub struct FleetDirectory {
    store: Arc<dyn DocumentStore>,
}

impl FleetDirectory {
    /// Create a directory over the given document store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Register a new bus
    ///
    /// Fails with `InvalidField` when the name or number is empty or the
    /// number is already registered, and with `RouteNotFound` when no
    /// stored route carries the bus's route number.
    pub async fn add_bus(&self, bus: Bus) -> Result<(), LedgerError> {
        if bus.name.trim().is_empty() {
            return Err(LedgerError::invalid_field("name", "bus name is required"));
        }
        if bus.number.trim().is_empty() {
            return Err(LedgerError::invalid_field(
                "number",
                "bus number is required",
            ));
        }
        if !self.route_number_exists(&bus.route_number).await? {
            return Err(LedgerError::route_not_found(&bus.route_number));
        }

        let number = bus.number.clone();
        if !self.store.create(BUSES, &number, bus.to_document()).await? {
            return Err(LedgerError::invalid_field(
                "number",
                "bus number already registered",
            ));
        }
        Ok(())
    }

    /// Update an existing bus
    ///
    /// Fails with `BusNotFound` when no bus carries the number.
    pub async fn update_bus(&self, bus: Bus) -> Result<(), LedgerError> {
        if !self.route_number_exists(&bus.route_number).await? {
            return Err(LedgerError::route_not_found(&bus.route_number));
        }

        match self
            .store
            .update(BUSES, &bus.number.clone(), bus.to_document())
            .await
        {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound { id, .. }) => Err(LedgerError::bus_not_found(&id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a bus (no-op when it does not exist)
    pub async fn remove_bus(&self, bus_number: &str) -> Result<(), LedgerError> {
        self.store.delete(BUSES, bus_number).await?;
        Ok(())
    }

    /// All registered buses, sorted by number
    pub async fn buses(&self) -> Result<Vec<Bus>, LedgerError> {
        let docs = self
            .store
            .query(BUSES, &[], Some(OrderBy::asc("number")))
            .await?;

        let mut buses = Vec::with_capacity(docs.len());
        for (id, doc) in docs {
            match Bus::from_document(&doc) {
                Some(bus) => buses.push(bus),
                None => warn!(bus = %id, "bus document missing required fields; skipping"),
            }
        }
        Ok(buses)
    }

    /// Look up a single bus by number
    pub async fn bus(&self, bus_number: &str) -> Result<Bus, LedgerError> {
        let doc = self
            .store
            .get(BUSES, bus_number)
            .await?
            .ok_or_else(|| LedgerError::bus_not_found(bus_number))?;
        Bus::from_document(&doc).ok_or_else(|| LedgerError::bus_not_found(bus_number))
    }

    /// Persist a route record
    ///
    /// Replaces the record occupying the same slot (route number +
    /// unordered endpoint pair + service type). When the same endpoint
    /// pair and service type already exists under a *different* route
    /// number, a data-integrity warning is logged but the write goes
    /// through - fleet data stays importable, and the route index
    /// tolerates the resulting ambiguity at read time.
    pub async fn upsert_route(&self, route: Route) -> Result<(), LedgerError> {
        let existing = self.store.query(ROUTES, &[], None).await?;
        for (_, doc) in &existing {
            if let Some(other) = decode_route(doc) {
                if other.route_number != route.route_number
                    && other.serves(&route.origin, &route.destination, &route.service_type)
                {
                    warn!(
                        new = %route.route_number,
                        existing = %other.route_number,
                        origin = %route.origin,
                        destination = %route.destination,
                        service_type = %route.service_type,
                        "duplicate endpoint pair for service type under another route number"
                    );
                }
            }
        }

        let id = route_slot_id(&route);
        self.store
            .set(ROUTES, &id, route_document(&route), false)
            .await?;
        Ok(())
    }

    /// Build a route index scoped to one route number
    ///
    /// This is the conductor path: conductor id, to assigned bus, to the
    /// bus's route number, to an index holding only that route number's
    /// records.
    pub async fn route_index(&self, route_number: &str) -> Result<RouteIndex, LedgerError> {
        let docs = self
            .store
            .query(
                ROUTES,
                &[Filter::eq_str("route_number", route_number)],
                Some(OrderBy::asc("origin")),
            )
            .await?;
        Ok(RouteIndex::from_routes(decode_routes(docs)))
    }

    /// Build a route index over every stored route
    pub async fn full_route_index(&self) -> Result<RouteIndex, LedgerError> {
        let docs = self
            .store
            .query(ROUTES, &[], Some(OrderBy::asc("origin")))
            .await?;
        Ok(RouteIndex::from_routes(decode_routes(docs)))
    }

    /// Assign a conductor to a bus
    ///
    /// Fails with `BusNotFound` when the bus does not exist. A fresh
    /// assignment starts inactive; sign-in flips the flag.
    pub async fn assign_conductor(
        &self,
        conductor: &str,
        bus_number: &str,
    ) -> Result<(), LedgerError> {
        if self.store.get(BUSES, bus_number).await?.is_none() {
            return Err(LedgerError::bus_not_found(bus_number));
        }

        let mut doc = Document::new();
        doc.insert("bus_number".to_string(), Value::from(bus_number));
        doc.insert("active".to_string(), Value::from(false));
        self.store.set(CONDUCTORS, conductor, doc, true).await?;
        Ok(())
    }

    /// Resolve the bus a conductor is assigned to
    pub async fn bus_for_conductor(&self, conductor: &str) -> Result<Bus, LedgerError> {
        let assignment = self
            .store
            .get(CONDUCTORS, conductor)
            .await?
            .ok_or_else(|| LedgerError::conductor_not_found(conductor))?;
        let bus_number = string_field(&assignment, "bus_number")
            .ok_or_else(|| LedgerError::conductor_not_found(conductor))?;
        self.bus(&bus_number).await
    }

    /// All conductor assignments, sorted by conductor id
    pub async fn conductors(&self) -> Result<Vec<ConductorAssignment>, LedgerError> {
        let docs = self.store.query(CONDUCTORS, &[], None).await?;

        let mut assignments = Vec::with_capacity(docs.len());
        for (id, doc) in docs {
            match string_field(&doc, "bus_number") {
                Some(bus_number) => assignments.push(ConductorAssignment {
                    conductor: id,
                    bus_number,
                    active: doc.get("active") == Some(&Value::from(true)),
                }),
                None => warn!(conductor = %id, "assignment document missing bus number; skipping"),
            }
        }
        assignments.sort_by(|a, b| a.conductor.cmp(&b.conductor));
        Ok(assignments)
    }

    /// Flip a conductor's active flag (sign-in / sign-out)
    pub async fn set_conductor_active(
        &self,
        conductor: &str,
        active: bool,
    ) -> Result<(), LedgerError> {
        let mut doc = Document::new();
        doc.insert("active".to_string(), Value::from(active));

        match self.store.update(CONDUCTORS, conductor, doc).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound { id, .. }) => Err(LedgerError::conductor_not_found(&id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Headline counts for the owner dashboard
    pub async fn fleet_stats(&self) -> Result<FleetStats, LedgerError> {
        let buses = self.store.query(BUSES, &[], None).await?;
        let conductors = self.store.query(CONDUCTORS, &[], None).await?;
        let active = conductors
            .iter()
            .filter(|(_, doc)| doc.get("active") == Some(&Value::from(true)))
            .count();

        Ok(FleetStats {
            total_buses: buses.len() as u32,
            total_conductors: conductors.len() as u32,
            active_conductors: active as u32,
        })
    }

    async fn route_number_exists(&self, route_number: &str) -> Result<bool, LedgerError> {
        let docs = self
            .store
            .query(
                ROUTES,
                &[Filter::eq_str("route_number", route_number)],
                None,
            )
            .await?;
        Ok(!docs.is_empty())
    }
}

/// Stable document id for a route slot
///
/// Endpoints are ordered lexicographically so both directions of the
/// same pair land on the same id and upsert replaces rather than
/// duplicates.
fn route_slot_id(route: &Route) -> String {
    let (a, b) = if route.origin <= route.destination {
        (&route.origin, &route.destination)
    } else {
        (&route.destination, &route.origin)
    };
    format!("{}|{}|{}|{}", route.route_number, a, b, route.service_type)
}

fn route_document(route: &Route) -> Document {
    let mut doc = Document::new();
    doc.insert(
        "route_number".to_string(),
        Value::from(route.route_number.clone()),
    );
    doc.insert("origin".to_string(), Value::from(route.origin.clone()));
    doc.insert(
        "destination".to_string(),
        Value::from(route.destination.clone()),
    );
    doc.insert(
        "service_type".to_string(),
        Value::from(route.service_type.clone()),
    );
    doc.insert("fare".to_string(), decimal_value(route.fare_per_person));
    doc
}

fn decode_route(doc: &Document) -> Option<Route> {
    Some(Route {
        route_number: string_field(doc, "route_number")?,
        origin: string_field(doc, "origin")?,
        destination: string_field(doc, "destination")?,
        service_type: string_field(doc, "service_type")?,
        fare_per_person: decimal_field(doc, "fare")?,
    })
}

fn decode_routes(docs: Vec<(String, Document)>) -> Vec<Route> {
    let mut routes = Vec::with_capacity(docs.len());
    for (id, doc) in docs {
        match decode_route(&doc) {
            Some(route) => routes.push(route),
            None => warn!(route = %id, "route document missing required fields; skipping"),
        }
    }
    routes
}
