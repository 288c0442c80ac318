//! Route and fare-quote types
//!
//! This module defines the route record, the transient trip request, and
//! the fare quote produced for a matched trip.

use rust_decimal::Decimal;

/// A fare-bearing path between two locations for a given service tier
///
/// Routes are undirected: a route serves both directions at the same
/// fare. For a given route number there is at most one record per
/// unordered origin/destination pair and service type; violations of
/// that invariant are tolerated at read time (first match wins, with a
/// data-integrity warning) rather than rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Route number as painted on the bus (e.g. "EX1-22")
    pub route_number: String,

    /// One endpoint of the route
    pub origin: String,

    /// The other endpoint of the route
    pub destination: String,

    /// Service tier label (e.g. "Normal", "Semi", "AC")
    pub service_type: String,

    /// Fare charged per passenger, in rupees
    pub fare_per_person: Decimal,
}

impl Route {
    /// Whether this route serves a trip between the two locations
    ///
    /// Matching is bidirectional: the pickup may be either endpoint as
    /// long as the destination is the other one. The service type must
    /// match exactly.
    pub fn serves(&self, pickup: &str, destination: &str, service_type: &str) -> bool {
        if self.service_type != service_type {
            return false;
        }
        (self.origin == pickup && self.destination == destination)
            || (self.origin == destination && self.destination == pickup)
    }

    /// Whether two records describe the same logical route slot
    ///
    /// Same route number, same unordered endpoint pair, same service
    /// type. Used by upsert to decide replace-vs-insert.
    pub fn same_slot(&self, other: &Route) -> bool {
        self.route_number == other.route_number
            && self.service_type == other.service_type
            && ((self.origin == other.origin && self.destination == other.destination)
                || (self.origin == other.destination && self.destination == other.origin))
    }
}

/// A fare-lookup request for one trip
///
/// Transient: created per lookup call, never persisted. Pickup and
/// destination may carry placeholder text straight from a selection UI;
/// the fare calculator treats those as unset.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRequest {
    /// Boarding location
    pub pickup: String,

    /// Alighting location
    pub destination: String,

    /// Requested service tier
    pub service_type: String,

    /// Number of passengers travelling together (must be at least 1)
    pub person_count: u32,
}

/// A successful fare quote
///
/// Invariant: `total_fare` equals `fare_per_person * person_count`,
/// rounded to 2 decimal places half-up.
#[derive(Debug, Clone, PartialEq)]
pub struct FareQuote {
    /// Fare charged per passenger on the matched route
    pub fare_per_person: Decimal,

    /// Number of passengers the quote covers
    pub person_count: u32,

    /// Total fare for the whole party
    pub total_fare: Decimal,

    /// Route number of the record that matched
    pub matched_route_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn colombo_kandy_ac() -> Route {
        Route {
            route_number: "EX1-22".to_string(),
            origin: "Colombo".to_string(),
            destination: "Kandy".to_string(),
            service_type: "AC".to_string(),
            fare_per_person: Decimal::new(45000, 2),
        }
    }

    #[rstest]
    #[case::forward("Colombo", "Kandy", "AC", true)]
    #[case::reverse("Kandy", "Colombo", "AC", true)]
    #[case::wrong_service("Colombo", "Kandy", "Normal", false)]
    #[case::wrong_destination("Colombo", "Galle", "AC", false)]
    #[case::same_endpoint("Colombo", "Colombo", "AC", false)]
    fn test_serves(
        #[case] pickup: &str,
        #[case] destination: &str,
        #[case] service: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(colombo_kandy_ac().serves(pickup, destination, service), expected);
    }

    #[test]
    fn test_same_slot_ignores_endpoint_order() {
        let forward = colombo_kandy_ac();
        let mut reversed = colombo_kandy_ac();
        reversed.origin = "Kandy".to_string();
        reversed.destination = "Colombo".to_string();
        reversed.fare_per_person = Decimal::new(50000, 2);

        assert!(forward.same_slot(&reversed));
    }

    #[test]
    fn test_same_slot_distinguishes_service_type() {
        let ac = colombo_kandy_ac();
        let mut normal = colombo_kandy_ac();
        normal.service_type = "Normal".to_string();

        assert!(!ac.same_slot(&normal));
    }
}
