//! Flight catalog: CSV ingestion and the origin-keyed adjacency graph.
//!
//! The catalog is built once from a schedule file and is read-only
//! afterwards, so a shared reference can serve any number of
//! concurrent route queries.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::{normalize_airport, FlightLeg, FlightRecord};

/// Errors raised while building the catalog. Either way the whole
/// build fails; there is no partially usable graph.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The data source could not be opened or read.
    #[error("cannot read flight data source: {0}")]
    DataSource(#[from] std::io::Error),
    /// A required column is missing or a value cannot be parsed.
    #[error("schema error in flight data (row {row}): {reason}")]
    Schema { row: usize, reason: String },
}

/// One CSV row with the loader's case-sensitive column names.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "FlightNumber")]
    flight_number: String,
    #[serde(rename = "Airline")]
    airline: String,
    #[serde(rename = "AircraftType")]
    aircraft_type: String,
    #[serde(rename = "SourceAirport")]
    source: String,
    #[serde(rename = "DestinationAirport")]
    destination: String,
    #[serde(rename = "DepartureDateTimeUTC")]
    departure_utc: String,
    #[serde(rename = "ArrivalDateTimeUTC")]
    arrival_utc: String,
    #[serde(rename = "Cost")]
    cost: String,
}

fn schema_error(row: usize, reason: impl Into<String>) -> CatalogError {
    CatalogError::Schema {
        row,
        reason: reason.into(),
    }
}

/// Parse an ISO-8601 timestamp; a trailing `Z` is treated as UTC.
/// Empty cells become `None` so the collision detector can flag them.
fn parse_timestamp(
    value: &str,
    column: &str,
    row: usize,
) -> Result<Option<DateTime<Utc>>, CatalogError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|e| schema_error(row, format!("bad {column} timestamp '{value}': {e}")))
}

/// Read and normalize all flight records from a CSV schedule.
///
/// A missing column or an unparseable value aborts the load; missing
/// timestamp *values* are allowed here and surface later as
/// validation conflicts.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<FlightRecord>, CatalogError> {
    let file = File::open(path.as_ref())?;
    let mut reader = csv::Reader::from_reader(file);

    let mut records = Vec::new();
    for (idx, row) in reader.deserialize::<RawRow>().enumerate() {
        // Header is row 1, first data row is row 2.
        let row_number = idx + 2;
        let raw = row.map_err(|e| schema_error(row_number, e.to_string()))?;

        let cost = {
            let value = raw.cost.trim();
            if value.is_empty() {
                None
            } else {
                Some(value.parse::<u32>().map_err(|e| {
                    schema_error(row_number, format!("bad Cost value '{value}': {e}"))
                })?)
            }
        };

        records.push(FlightRecord {
            flight_number: raw.flight_number.trim().to_string(),
            airline: raw.airline.trim().to_string(),
            aircraft_type: raw.aircraft_type.trim().to_string(),
            source: normalize_airport(&raw.source),
            destination: normalize_airport(&raw.destination),
            departure_utc: parse_timestamp(&raw.departure_utc, "DepartureDateTimeUTC", row_number)?,
            arrival_utc: parse_timestamp(&raw.arrival_utc, "ArrivalDateTimeUTC", row_number)?,
            cost,
        });
    }

    debug!(records = records.len(), "loaded flight records");
    Ok(records)
}

/// The immutable flight network: outbound legs keyed by origin airport
/// plus the set of every airport seen in the schedule.
#[derive(Debug, Clone)]
pub struct FlightCatalog {
    graph: HashMap<String, Vec<FlightLeg>>,
    airports: BTreeSet<String>,
}

impl FlightCatalog {
    /// Build the catalog from a CSV schedule file.
    pub fn build(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let records = read_records(path)?;
        // Re-label record numbers as CSV rows (the header is row 1).
        Self::from_records(&records).map_err(|e| match e {
            CatalogError::Schema { row, reason } => CatalogError::Schema { row: row + 1, reason },
            other => other,
        })
    }

    /// Build the catalog from already-loaded records.
    ///
    /// Every record must carry both timestamps, an arrival strictly
    /// after the departure, and a cost; a record that does not is a
    /// schema failure and the build is abandoned. Errors cite the
    /// 1-based record number; only the CSV path applies a header
    /// offset on top.
    pub fn from_records(records: &[FlightRecord]) -> Result<Self, CatalogError> {
        let mut graph: HashMap<String, Vec<FlightLeg>> = HashMap::new();
        let mut airports = BTreeSet::new();

        for (idx, record) in records.iter().enumerate() {
            let row = idx + 1;
            let departure_utc = record
                .departure_utc
                .ok_or_else(|| schema_error(row, "missing DepartureDateTimeUTC"))?;
            let arrival_utc = record
                .arrival_utc
                .ok_or_else(|| schema_error(row, "missing ArrivalDateTimeUTC"))?;
            if arrival_utc <= departure_utc {
                return Err(schema_error(
                    row,
                    format!(
                        "flight {}: arrival {arrival_utc} not after departure {departure_utc}",
                        record.flight_number
                    ),
                ));
            }
            let cost = record.cost.ok_or_else(|| schema_error(row, "missing Cost"))?;

            airports.insert(record.source.clone());
            airports.insert(record.destination.clone());

            // Duplicate flight numbers and identical legs are kept as
            // distinct edges; insertion order follows row order.
            graph
                .entry(record.source.clone())
                .or_default()
                .push(FlightLeg {
                    flight_number: record.flight_number.clone(),
                    airline: record.airline.clone(),
                    aircraft_type: record.aircraft_type.clone(),
                    source: record.source.clone(),
                    destination: record.destination.clone(),
                    departure_utc,
                    arrival_utc,
                    cost,
                });
        }

        debug!(
            airports = airports.len(),
            legs = graph.values().map(Vec::len).sum::<usize>(),
            "flight catalog built"
        );
        Ok(Self { graph, airports })
    }

    /// Outbound legs from an airport, in schedule row order. Empty for
    /// airports that only appear as destinations.
    pub fn outbound(&self, airport: &str) -> &[FlightLeg] {
        self.graph.get(airport).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every airport seen in the schedule, sorted.
    pub fn airports(&self) -> impl Iterator<Item = &str> {
        self.airports.iter().map(String::as_str)
    }

    pub fn contains_airport(&self, airport: &str) -> bool {
        self.airports.contains(airport)
    }

    pub fn airport_count(&self) -> usize {
        self.airports.len()
    }

    pub fn leg_count(&self) -> usize {
        self.graph.values().map(Vec::len).sum()
    }
}
