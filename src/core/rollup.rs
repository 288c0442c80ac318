//! Revenue and passenger rollups
//!
//! Pure computation over ticket snapshots: aggregation is a function of
//! the tickets handed in, independent of whether that snapshot arrived
//! via a pull query or a change-feed-triggered re-query.

use crate::types::{DailyRollup, TicketRecord};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

/// Aggregate tickets within a half-open time window
///
/// Counts tickets with `window_start <= created_at < window_end`. Fares
/// that are missing or non-numeric count as 0 with a data-quality
/// warning logged per occurrence - the ticket itself still counts.
/// Missing person counts count as 0 silently (the field is optional on
/// wallet-debit tickets).
pub fn aggregate(
    tickets: &[TicketRecord],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> DailyRollup {
    let mut ticket_count: u32 = 0;
    let mut passenger_count: u32 = 0;
    let mut total_fare = Decimal::ZERO;

    for ticket in tickets {
        if ticket.created_at < window_start || ticket.created_at >= window_end {
            continue;
        }

        ticket_count += 1;
        passenger_count = passenger_count.saturating_add(ticket.person_count.unwrap_or(0));

        match ticket.fare {
            Some(fare) => match total_fare.checked_add(fare) {
                Some(sum) => total_fare = sum,
                None => {
                    warn!(ticket_id = %ticket.id, "fare sum overflow; skipping ticket fare");
                }
            },
            None => {
                warn!(
                    ticket_id = %ticket.id,
                    bus = %ticket.bus_number,
                    "ticket has missing or non-numeric fare; counting as 0"
                );
            }
        }
    }

    DailyRollup {
        window_start,
        ticket_count,
        passenger_count,
        total_fare,
    }
}

/// Day-over-day revenue change in percent, rounded to 1 decimal half-up
///
/// Returns None - undefined, not zero and not an error - when the
/// previous window's revenue is zero: there is no meaningful percentage
/// change from a zero baseline, and callers must render it as "no prior
/// data" rather than 0% or infinity.
pub fn percent_change(current: &DailyRollup, previous: &DailyRollup) -> Option<Decimal> {
    relative_change(current.total_fare, previous.total_fare)
}

/// Day-over-day passenger-count change in percent
///
/// Same zero-baseline rule as [`percent_change`], keyed on the previous
/// window's passenger count.
pub fn passenger_change(current: &DailyRollup, previous: &DailyRollup) -> Option<Decimal> {
    relative_change(
        Decimal::from(current.passenger_count),
        Decimal::from(previous.passenger_count),
    )
}

fn relative_change(current: Decimal, previous: Decimal) -> Option<Decimal> {
    if previous == Decimal::ZERO {
        return None;
    }
    let change = current.checked_sub(previous)?.checked_div(previous)?;
    change
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|p| p.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
}

/// The half-open UTC day window covering a date
pub fn day_window(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ticket(id: &str, fare: Option<&str>, persons: Option<u32>, at: DateTime<Utc>) -> TicketRecord {
        TicketRecord {
            id: id.to_string(),
            bus_number: "NB-1".to_string(),
            route_number: None,
            fare: fare.map(dec),
            person_count: persons,
            passenger: None,
            created_at: at,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn rollup(total: &str, passengers: u32) -> DailyRollup {
        DailyRollup {
            window_start: at(1, 0),
            ticket_count: 1,
            passenger_count: passengers,
            total_fare: dec(total),
        }
    }

    #[test]
    fn test_aggregate_day_window_is_half_open() {
        // Tickets at Day1 10:00 (150), Day1 14:00 (200), Day2 09:00
        // (300); the [Day1, Day2) window covers exactly the first two.
        let tickets = vec![
            ticket("t1", Some("150"), Some(1), at(1, 10)),
            ticket("t2", Some("200"), Some(2), at(1, 14)),
            ticket("t3", Some("300"), Some(1), at(2, 9)),
        ];
        let (start, end) = day_window(at(1, 0).date_naive());

        let result = aggregate(&tickets, start, end);

        assert_eq!(result.ticket_count, 2);
        assert_eq!(result.passenger_count, 3);
        assert_eq!(result.total_fare, dec("350"));
    }

    #[test]
    fn test_aggregate_excludes_window_end_boundary() {
        let (start, end) = day_window(at(1, 0).date_naive());
        let tickets = vec![
            ticket("t1", Some("100"), None, start),
            ticket("t2", Some("100"), None, end),
        ];

        let result = aggregate(&tickets, start, end);
        assert_eq!(result.ticket_count, 1);
        assert_eq!(result.total_fare, dec("100"));
    }

    #[test]
    fn test_aggregate_empty_input_is_all_zeroes() {
        let (start, end) = day_window(at(1, 0).date_naive());
        let result = aggregate(&[], start, end);

        assert_eq!(result.ticket_count, 0);
        assert_eq!(result.passenger_count, 0);
        assert_eq!(result.total_fare, Decimal::ZERO);
    }

    #[test]
    fn test_aggregate_counts_bad_fare_as_zero() {
        let (start, end) = day_window(at(1, 0).date_naive());
        let tickets = vec![
            ticket("t1", Some("150"), Some(2), at(1, 10)),
            ticket("t2", None, Some(1), at(1, 11)),
        ];

        let result = aggregate(&tickets, start, end);

        // The bad-fare ticket still counts in both tallies.
        assert_eq!(result.ticket_count, 2);
        assert_eq!(result.passenger_count, 3);
        assert_eq!(result.total_fare, dec("150"));
    }

    #[rstest]
    #[case::growth("150", "100", Some("50.0"))]
    #[case::decline("80", "100", Some("-20.0"))]
    #[case::flat("100", "100", Some("0.0"))]
    #[case::rounds_half_up("1001", "3000", Some("-66.6"))] // -66.6333...
    #[case::zero_baseline("150", "0", None)]
    #[case::both_zero("0", "0", None)]
    fn test_percent_change(
        #[case] current: &str,
        #[case] previous: &str,
        #[case] expected: Option<&str>,
    ) {
        let result = percent_change(&rollup(current, 0), &rollup(previous, 0));
        assert_eq!(result, expected.map(dec));
    }

    #[rstest]
    #[case::growth(30, 20, Some("50.0"))]
    #[case::zero_baseline(30, 0, None)]
    fn test_passenger_change(
        #[case] current: u32,
        #[case] previous: u32,
        #[case] expected: Option<&str>,
    ) {
        let result = passenger_change(&rollup("0", current), &rollup("0", previous));
        assert_eq!(result, expected.map(dec));
    }

    #[test]
    fn test_day_window_spans_exactly_one_day() {
        let date = at(1, 0).date_naive();
        let (start, end) = day_window(date);

        assert_eq!(start, at(1, 0));
        assert_eq!(end, at(2, 0));
    }
}
