//! Core data models for the flight network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scheduled flight, the edge unit of the network graph.
///
/// Timestamps are UTC and the arrival is strictly after the departure;
/// the catalog enforces this at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightLeg {
    pub flight_number: String,
    pub airline: String,
    pub aircraft_type: String,
    pub source: String,
    pub destination: String,
    pub departure_utc: DateTime<Utc>,
    pub arrival_utc: DateTime<Utc>,
    pub cost: u32,
}

impl FlightLeg {
    /// Airborne time of this leg in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.arrival_utc - self.departure_utc).num_minutes()
    }
}

/// A raw schedule row, before time validation.
///
/// The catalog rejects rows with missing or inverted timestamps and
/// fails the whole build. The collision detector accepts them and
/// reports the problem as a per-flight conflict instead, which is why
/// the timestamps stay optional here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub flight_number: String,
    pub airline: String,
    pub aircraft_type: String,
    pub source: String,
    pub destination: String,
    pub departure_utc: Option<DateTime<Utc>>,
    pub arrival_utc: Option<DateTime<Utc>>,
    pub cost: Option<u32>,
}

impl FlightRecord {
    /// Grouping key for one physical aircraft's chronology of flights.
    ///
    /// Composite of airline, aircraft type and flight number. Not a
    /// stored entity, only a key into the detector's schedules.
    pub fn aircraft_identity(&self) -> String {
        format!(
            "{}-{}-{}",
            self.airline, self.aircraft_type, self.flight_number
        )
    }
}

/// The quantity minimized by the routing search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    /// Total fare across all legs.
    Cost,
    /// Total elapsed time from first departure to last arrival.
    Time,
    /// Blended score of duration, layovers and weighted fare.
    Best,
}

impl std::str::FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cost" => Ok(Objective::Cost),
            "time" => Ok(Objective::Time),
            "best" => Ok(Objective::Best),
            other => Err(format!("unknown objective '{other}'")),
        }
    }
}

/// Traveler preferences applied during the route search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Airline whose legs get a scoring discount.
    #[serde(default)]
    pub preferred_airline: Option<String>,
    /// Airline whose legs are excluded from itineraries outright.
    #[serde(default)]
    pub avoid_airline: Option<String>,
}

impl Preferences {
    pub fn prefers(&self, airline: &str) -> bool {
        self.preferred_airline.as_deref() == Some(airline)
    }

    pub fn avoids(&self, airline: &str) -> bool {
        self.avoid_airline.as_deref() == Some(airline)
    }
}

/// Normalize an airport code: trim surrounding whitespace, uppercase.
pub fn normalize_airport(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aircraft_identity_is_airline_type_number() {
        let record = FlightRecord {
            flight_number: "BA112".to_string(),
            airline: "BA".to_string(),
            aircraft_type: "B777".to_string(),
            source: "JFK".to_string(),
            destination: "LHR".to_string(),
            departure_utc: None,
            arrival_utc: None,
            cost: None,
        };
        assert_eq!(record.aircraft_identity(), "BA-B777-BA112");
    }

    #[test]
    fn normalize_airport_trims_and_uppercases() {
        assert_eq!(normalize_airport("  jfk "), "JFK");
        assert_eq!(normalize_airport("DXB"), "DXB");
    }

    #[test]
    fn objective_parses_case_insensitively() {
        assert_eq!("Cost".parse::<Objective>().unwrap(), Objective::Cost);
        assert_eq!("best".parse::<Objective>().unwrap(), Objective::Best);
        assert!("fastest".parse::<Objective>().is_err());
    }
}
