//! Route index with bidirectional lookup
//!
//! An in-memory set of route records used by the fare calculator. The
//! index is a read-shared snapshot: only the fleet directory mutates
//! routes, and it builds fresh indexes from the store rather than
//! mutating one in place under readers.

use crate::types::Route;
use tracing::warn;

/// In-memory set of route records for fare resolution
///
/// Lookup is bidirectional: a route matches a trip in either direction
/// at the same fare. When duplicate records match the same trip (a
/// data-quality anomaly in the stored route table), the first record in
/// index order wins deterministically and a data-integrity warning is
/// logged - the ambiguity must be observable, never silent.
#[derive(Debug, Clone, Default)]
pub struct RouteIndex {
    routes: Vec<Route>,
}

impl RouteIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a list of route records, preserving order
    pub fn from_routes(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Find the route serving a trip, matching in either direction
    ///
    /// Returns the first matching record in index order. Logs a warning
    /// listing the colliding route numbers when more than one record
    /// matches.
    pub fn find_route(
        &self,
        pickup: &str,
        destination: &str,
        service_type: &str,
    ) -> Option<&Route> {
        let mut matches = self
            .routes
            .iter()
            .filter(|r| r.serves(pickup, destination, service_type));

        let first = matches.next()?;

        let extra: Vec<&str> = matches.map(|r| r.route_number.as_str()).collect();
        if !extra.is_empty() {
            warn!(
                pickup,
                destination,
                service_type,
                matched = %first.route_number,
                ignored = ?extra,
                "ambiguous route match; using first record in index order"
            );
        }

        Some(first)
    }

    /// Insert a route, replacing any record with the same slot
    ///
    /// The slot is route number plus unordered endpoint pair plus
    /// service type. Exposed for the fleet-management collaborator.
    pub fn upsert(&mut self, route: Route) {
        match self.routes.iter_mut().find(|r| r.same_slot(&route)) {
            Some(existing) => *existing = route,
            None => self.routes.push(route),
        }
    }

    /// Full snapshot of the indexed routes
    pub fn all(&self) -> &[Route] {
        &self.routes
    }

    /// Distinct locations served, sorted, for selection UIs
    pub fn locations(&self) -> Vec<String> {
        let mut locations: Vec<String> = self
            .routes
            .iter()
            .flat_map(|r| [r.origin.clone(), r.destination.clone()])
            .collect();
        locations.sort();
        locations.dedup();
        locations
    }

    /// Distinct service tiers offered, sorted, for selection UIs
    pub fn service_types(&self) -> Vec<String> {
        let mut services: Vec<String> =
            self.routes.iter().map(|r| r.service_type.clone()).collect();
        services.sort();
        services.dedup();
        services
    }
}
