//! Fare calculation
//!
//! A pure function over a trip request and a route-index snapshot: no
//! side effects, no store access. Quoting never writes anything.

use crate::core::route_index::RouteIndex;
use crate::types::{FareQuote, LedgerError, TripRequest};
use rust_decimal::{Decimal, RoundingStrategy};

/// Whether a selection value is unset
///
/// Selection UIs feed through either empty text or the literal
/// placeholder "select"; both mean the field was never chosen.
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("select")
}

/// Quote the total fare for a trip request against a route index
///
/// Fails with:
/// - `InvalidPersonCount` when the party size is below 1
/// - `NoMatchingRoute` when pickup, destination, or service type is
///   unset/placeholder, or when no route serves the trip in either
///   direction
///
/// On success, the total fare is `fare_per_person * person_count`
/// rounded to 2 decimal places half-up.
pub fn quote(request: &TripRequest, index: &RouteIndex) -> Result<FareQuote, LedgerError> {
    if request.person_count < 1 {
        return Err(LedgerError::InvalidPersonCount {
            count: request.person_count,
        });
    }

    if is_placeholder(&request.pickup)
        || is_placeholder(&request.destination)
        || is_placeholder(&request.service_type)
    {
        return Err(LedgerError::no_matching_route(
            &request.pickup,
            &request.destination,
            &request.service_type,
        ));
    }

    let route = index
        .find_route(&request.pickup, &request.destination, &request.service_type)
        .ok_or_else(|| {
            LedgerError::no_matching_route(
                &request.pickup,
                &request.destination,
                &request.service_type,
            )
        })?;

    let total_fare = route
        .fare_per_person
        .checked_mul(Decimal::from(request.person_count))
        .ok_or_else(|| LedgerError::arithmetic_overflow("quote", &request.pickup))?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Ok(FareQuote {
        fare_per_person: route.fare_per_person,
        person_count: request.person_count,
        total_fare,
        matched_route_number: route.route_number.clone(),
    })
}
