//! CSV format handling for replay input and report output
//!
//! Centralizes the CSV format concerns of the replay tool:
//! - `OpCsvRecord` deserialization and conversion to [`ReplayOp`]
//! - route-table loading into a [`RouteIndex`]
//! - balances and rollups report serialization
//!
//! Conversion functions are pure (no I/O) for easy testing.

use crate::core::route_index::RouteIndex;
use crate::types::{DailyRollup, ReplayOp, Route};
use chrono::{DateTime, NaiveDate, Utc};
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// One raw row of the replay input CSV
///
/// Columns: `op,account,amount,bus,pickup,destination,service,persons,at`.
/// Everything past `op` is optional at the CSV level because each
/// operation kind uses a different subset; `convert_op_record` enforces
/// which fields each kind requires.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OpCsvRecord {
    pub op: String,
    pub account: Option<String>,
    pub amount: Option<String>,
    pub bus: Option<String>,
    pub pickup: Option<String>,
    pub destination: Option<String>,
    pub service: Option<String>,
    pub persons: Option<String>,
    pub at: Option<String>,
}

/// Convert a raw CSV row into a replay operation
///
/// Validates that the fields the operation kind requires are present
/// and parseable. Errors are strings so the readers can prepend line
/// numbers.
pub fn convert_op_record(record: OpCsvRecord) -> Result<ReplayOp, String> {
    let at = parse_timestamp(record.at.as_deref())?;

    match record.op.to_lowercase().as_str() {
        "topup" => Ok(ReplayOp::TopUp {
            account: require(record.account, "account", "topup")?,
            amount: parse_amount(record.amount, "topup")?,
            at,
        }),
        "debit" => Ok(ReplayOp::Debit {
            account: require(record.account, "account", "debit")?,
            amount: parse_amount(record.amount, "debit")?,
            bus: require(record.bus, "bus", "debit")?,
            persons: parse_persons(record.persons.as_deref())?,
            at,
        }),
        "issue" => Ok(ReplayOp::Issue {
            bus: require(record.bus, "bus", "issue")?,
            pickup: require(record.pickup, "pickup", "issue")?,
            destination: require(record.destination, "destination", "issue")?,
            service: require(record.service, "service", "issue")?,
            persons: parse_persons(record.persons.as_deref())?
                .ok_or_else(|| "issue requires persons".to_string())?,
            at,
        }),
        other => Err(format!("Invalid operation: '{}'", other)),
    }
}

fn require(value: Option<String>, field: &str, op: &str) -> Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(format!("{} requires {}", op, field)),
    }
}

fn parse_amount(value: Option<String>, op: &str) -> Result<Decimal, String> {
    let raw = require(value, "amount", op)?;
    Decimal::from_str(&raw).map_err(|_| format!("Invalid amount '{}'", raw))
}

fn parse_persons(value: Option<&str>) -> Result<Option<u32>, String> {
    match value {
        Some(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| format!("Invalid persons '{}'", v)),
        _ => Ok(None),
    }
}

fn parse_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        Some(v) if !v.trim().is_empty() => DateTime::parse_from_rfc3339(v.trim())
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| format!("Invalid timestamp '{}'", v)),
        _ => Ok(None),
    }
}

/// One row of a route-table CSV
///
/// Columns: `route_number,origin,destination,service_type,fare`.
#[derive(Debug, Deserialize)]
struct RouteCsvRecord {
    route_number: String,
    origin: String,
    destination: String,
    service_type: String,
    fare: String,
}

/// Load a route-table CSV into a route index
///
/// Any malformed row is a hard error: a silently truncated route table
/// would turn valid issuance operations into spurious no-match
/// failures.
pub fn load_route_index(path: &Path) -> Result<RouteIndex, String> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| format!("Failed to open route table '{}': {}", path.display(), e))?;

    let mut routes = Vec::new();
    for (i, result) in reader.deserialize::<RouteCsvRecord>().enumerate() {
        let record =
            result.map_err(|e| format!("Route table line {}: {}", i + 2, e))?;
        let fare = Decimal::from_str(&record.fare).map_err(|_| {
            format!(
                "Route table line {}: invalid fare '{}'",
                i + 2,
                record.fare
            )
        })?;
        routes.push(Route {
            route_number: record.route_number,
            origin: record.origin,
            destination: record.destination,
            service_type: record.service_type,
            fare_per_person: fare,
        });
    }

    Ok(RouteIndex::from_routes(routes))
}

/// Write the balances report as CSV
///
/// Columns: `account,balance`, balances rendered with 2 decimal places.
/// Input is expected pre-sorted by account.
pub fn write_balances_csv(
    balances: &[(String, Decimal)],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for (account, balance) in balances {
        writer
            .write_record(&[account.clone(), format!("{:.2}", balance)])
            .map_err(|e| format!("Failed to write balance record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;
    Ok(())
}

/// Write the rollups report as CSV
///
/// Columns: `day,tickets,passengers,total_fare`, one row per day in
/// input order, fares rendered with 2 decimal places.
pub fn write_rollups_csv(
    rollups: &[(NaiveDate, DailyRollup)],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["day", "tickets", "passengers", "total_fare"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for (day, rollup) in rollups {
        writer
            .write_record(&[
                day.format("%Y-%m-%d").to_string(),
                rollup.ticket_count.to_string(),
                rollup.passenger_count.to_string(),
                format!("{:.2}", rollup.total_fare),
            ])
            .map_err(|e| format!("Failed to write rollup record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;
    Ok(())
}
