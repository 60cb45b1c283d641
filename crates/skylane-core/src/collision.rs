//! Schedule collision detection across three physical resources:
//! aircraft rotations, runway slots and gates.
//!
//! The detector is stateful and sequential by design. Flights are
//! registered in chronological departure order and each successful
//! registration extends the per-resource schedules that later flights
//! are checked against. Concurrent validation of independent
//! schedules needs independent detector instances.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::FlightRecord;

/// Reference scheduling policy. Every knob is overridable for tests
/// and for airports with unusual ground operations.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Minimum ground time between an aircraft's landing and its next
    /// departure from the same airport, minutes.
    pub turnaround_minutes: i64,
    /// Minimum time for an aircraft to be repositioned to a different
    /// departure airport, minutes.
    pub repositioning_minutes: i64,
    /// Minimum separation between any two runway operations at one
    /// airport, minutes.
    pub runway_separation_minutes: i64,
    /// Gate occupancy lead-in before departure, minutes.
    pub gate_departure_buffer_minutes: i64,
    /// Gate occupancy after arrival, minutes.
    pub gate_arrival_buffer_minutes: i64,
    /// Gate capacity per airport; airports absent from the table get
    /// `default_gate_capacity`.
    pub gate_capacity: HashMap<String, usize>,
    /// Gate capacity for airports not in the table.
    pub default_gate_capacity: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let gate_capacity = [
            ("JFK", 128),
            ("LHR", 115),
            ("CDG", 76),
            ("AMS", 72),
            ("DXB", 97),
            ("BOM", 62),
            ("HND", 78),
            ("SYD", 46),
            ("DFW", 165),
            ("SFO", 57),
            ("LAX", 146),
            ("ATL", 195),
        ]
        .into_iter()
        .map(|(code, gates)| (code.to_string(), gates))
        .collect();

        Self {
            turnaround_minutes: 45,
            repositioning_minutes: 120,
            runway_separation_minutes: 5,
            gate_departure_buffer_minutes: 30,
            gate_arrival_buffer_minutes: 45,
            gate_capacity,
            default_gate_capacity: 50,
        }
    }
}

impl DetectorConfig {
    fn gates_at(&self, airport: &str) -> usize {
        self.gate_capacity
            .get(airport)
            .copied()
            .unwrap_or(self.default_gate_capacity)
    }
}

/// Category of a detected conflict. Carried alongside the message so
/// the summary never has to scan message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Missing or non-increasing timestamps on the record itself.
    InvalidTimes,
    /// Aircraft still airborne or turnaround too short.
    Aircraft,
    /// Aircraft at the wrong airport with too little time to move.
    Positioning,
    /// Runway operations closer than the separation minimum.
    Runway,
    /// Gate demand above the airport's capacity.
    Gate,
}

/// One detected violation of a physical scheduling constraint.
#[derive(Debug, Clone, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub message: String,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// A rejected flight with everything that was wrong with it.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFlight {
    pub flight_number: String,
    pub conflicts: Vec<Conflict>,
}

/// Tally of conflicts over the four physical categories. Invalid-time
/// rejections count toward `failed` in the report but not here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConflictSummary {
    pub aircraft_conflicts: usize,
    pub runway_conflicts: usize,
    pub gate_conflicts: usize,
    pub positioning_conflicts: usize,
}

/// Outcome of one full-schedule validation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub total_flights: usize,
    pub successful: usize,
    pub failed: usize,
    pub conflicts: Vec<Conflict>,
    pub successful_flights: Vec<String>,
    pub failed_flights: Vec<FailedFlight>,
    pub summary: ConflictSummary,
}

/// Read-only utilization figures for one airport.
#[derive(Debug, Clone, Serialize)]
pub struct AirportStats {
    pub airport: String,
    pub runway_operations: usize,
    pub gate_reservations: usize,
    pub gate_capacity: usize,
    pub utilization_pct: f64,
}

#[derive(Debug, Clone)]
struct AircraftBooking {
    departure_utc: DateTime<Utc>,
    arrival_utc: DateTime<Utc>,
    destination: String,
    flight_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunwayOp {
    Departure,
    Arrival,
}

impl std::fmt::Display for RunwayOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunwayOp::Departure => f.write_str("departure"),
            RunwayOp::Arrival => f.write_str("arrival"),
        }
    }
}

#[derive(Debug, Clone)]
struct RunwayEvent {
    time: DateTime<Utc>,
    op: RunwayOp,
    flight_number: String,
}

#[derive(Debug, Clone)]
struct GateReservation {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Stateful conflict checker over aircraft, runway and gate schedules.
#[derive(Debug, Default)]
pub struct CollisionDetector {
    config: DetectorConfig,
    aircraft_schedules: HashMap<String, Vec<AircraftBooking>>,
    runway_schedules: HashMap<String, Vec<RunwayEvent>>,
    gate_schedules: HashMap<String, Vec<GateReservation>>,
    /// Flight numbers in commit order. Duplicate numbers are legal in
    /// a schedule, so this is a list rather than a set.
    active_flights: Vec<String>,
}

impl CollisionDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            config,
            aircraft_schedules: HashMap::new(),
            runway_schedules: HashMap::new(),
            gate_schedules: HashMap::new(),
            active_flights: Vec::new(),
        }
    }

    /// Register one flight, collecting every conflict it triggers.
    ///
    /// The flight's reservations are committed only when the returned
    /// list is empty; a conflicting flight leaves no trace in any
    /// schedule.
    pub fn register_flight(&mut self, record: &FlightRecord) -> Vec<Conflict> {
        let flight = record.flight_number.as_str();

        let (Some(departure), Some(arrival)) = (record.departure_utc, record.arrival_utc) else {
            return vec![Conflict {
                kind: ConflictKind::InvalidTimes,
                message: format!("missing departure or arrival time for {flight}"),
            }];
        };
        if arrival <= departure {
            return vec![Conflict {
                kind: ConflictKind::InvalidTimes,
                message: format!(
                    "invalid times for {flight}: arrival {arrival} not after departure {departure}"
                ),
            }];
        }

        let aircraft_id = record.aircraft_identity();
        let mut conflicts = Vec::new();

        if let Some(conflict) =
            self.check_aircraft_conflict(&aircraft_id, flight, &record.source, departure)
        {
            conflicts.push(conflict);
        }
        if let Some(conflict) =
            self.check_runway_conflict(&record.source, departure, RunwayOp::Departure, flight)
        {
            conflicts.push(conflict);
        }
        if let Some(conflict) =
            self.check_runway_conflict(&record.destination, arrival, RunwayOp::Arrival, flight)
        {
            conflicts.push(conflict);
        }

        let gate_lead = Duration::minutes(self.config.gate_departure_buffer_minutes);
        let gate_tail = Duration::minutes(self.config.gate_arrival_buffer_minutes);
        if let Some(conflict) =
            self.check_gate_capacity(&record.source, departure - gate_lead, departure, flight)
        {
            conflicts.push(conflict);
        }
        if let Some(conflict) =
            self.check_gate_capacity(&record.destination, arrival, arrival + gate_tail, flight)
        {
            conflicts.push(conflict);
        }

        if conflicts.is_empty() {
            self.aircraft_schedules
                .entry(aircraft_id)
                .or_default()
                .push(AircraftBooking {
                    departure_utc: departure,
                    arrival_utc: arrival,
                    destination: record.destination.clone(),
                    flight_number: flight.to_string(),
                });
            self.runway_schedules
                .entry(record.source.clone())
                .or_default()
                .push(RunwayEvent {
                    time: departure,
                    op: RunwayOp::Departure,
                    flight_number: flight.to_string(),
                });
            self.runway_schedules
                .entry(record.destination.clone())
                .or_default()
                .push(RunwayEvent {
                    time: arrival,
                    op: RunwayOp::Arrival,
                    flight_number: flight.to_string(),
                });
            self.gate_schedules
                .entry(record.source.clone())
                .or_default()
                .push(GateReservation {
                    start: departure - gate_lead,
                    end: departure,
                });
            self.gate_schedules
                .entry(record.destination.clone())
                .or_default()
                .push(GateReservation {
                    start: arrival,
                    end: arrival + gate_tail,
                });
            self.active_flights.push(flight.to_string());
        }

        conflicts
    }

    /// Check the aircraft's existing chronology against a new
    /// departure. Returns the first violation found.
    fn check_aircraft_conflict(
        &self,
        aircraft_id: &str,
        flight: &str,
        departure_airport: &str,
        departure: DateTime<Utc>,
    ) -> Option<Conflict> {
        let bookings = self.aircraft_schedules.get(aircraft_id)?;

        let mut previous: Vec<&AircraftBooking> = bookings.iter().collect();
        previous.sort_by_key(|b| b.departure_utc);

        for prev in previous {
            // The aircraft is still airborne on its previous rotation.
            if departure < prev.arrival_utc {
                let overlap = (prev.arrival_utc - departure).num_minutes();
                return Some(Conflict {
                    kind: ConflictKind::Aircraft,
                    message: format!(
                        "aircraft conflict: {aircraft_id} is still flying {} (lands {}) \
                         but {flight} departs {departure} ({overlap} min overlap)",
                        prev.flight_number, prev.arrival_utc
                    ),
                });
            }

            let ground_minutes = (departure - prev.arrival_utc).num_minutes();
            if prev.destination == departure_airport {
                if ground_minutes < self.config.turnaround_minutes {
                    return Some(Conflict {
                        kind: ConflictKind::Aircraft,
                        message: format!(
                            "insufficient turnaround: {aircraft_id} has {ground_minutes} min \
                             between {} and {flight} at {departure_airport}, needs {} min",
                            prev.flight_number, self.config.turnaround_minutes
                        ),
                    });
                }
            } else if ground_minutes < self.config.repositioning_minutes {
                return Some(Conflict {
                    kind: ConflictKind::Positioning,
                    message: format!(
                        "positioning conflict: {aircraft_id} lands at {} after {} \
                         but must depart {departure_airport} as {flight} only \
                         {ground_minutes} min later, needs {} min to reposition",
                        prev.destination, prev.flight_number, self.config.repositioning_minutes
                    ),
                });
            }
        }

        None
    }

    fn check_runway_conflict(
        &self,
        airport: &str,
        time: DateTime<Utc>,
        op: RunwayOp,
        flight: &str,
    ) -> Option<Conflict> {
        let events = self.runway_schedules.get(airport)?;

        for event in events {
            let gap = (time - event.time).num_minutes().abs();
            if gap < self.config.runway_separation_minutes {
                return Some(Conflict {
                    kind: ConflictKind::Runway,
                    message: format!(
                        "runway conflict at {airport}: {flight} ({op}) at {time} is \
                         {gap} min from {} ({}) at {}, needs {} min separation",
                        event.flight_number, event.op, event.time,
                        self.config.runway_separation_minutes
                    ),
                });
            }
        }

        None
    }

    fn check_gate_capacity(
        &self,
        airport: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        flight: &str,
    ) -> Option<Conflict> {
        let capacity = self.config.gates_at(airport);
        let overlapping = self
            .gate_schedules
            .get(airport)
            .map(|reservations| {
                reservations
                    .iter()
                    .filter(|r| start < r.end && r.start < end)
                    .count()
            })
            .unwrap_or(0);

        if overlapping >= capacity {
            return Some(Conflict {
                kind: ConflictKind::Gate,
                message: format!(
                    "gate capacity exceeded at {airport}: {}/{capacity} gates needed \
                     when adding {flight} ({start} - {end})",
                    overlapping + 1
                ),
            });
        }

        None
    }

    /// Validate a whole proposed schedule.
    ///
    /// Records are processed in ascending departure order regardless
    /// of input order; blame for a conflict therefore always falls on
    /// the later-departing flight. Missing departures sort first.
    pub fn validate_schedule(&mut self, flights: &[FlightRecord]) -> ValidationReport {
        let mut ordered: Vec<&FlightRecord> = flights.iter().collect();
        ordered.sort_by_key(|f| f.departure_utc.unwrap_or(DateTime::<Utc>::MIN_UTC));

        let mut all_conflicts = Vec::new();
        let mut successful_flights = Vec::new();
        let mut failed_flights = Vec::new();

        for record in ordered {
            let conflicts = self.register_flight(record);
            if conflicts.is_empty() {
                successful_flights.push(record.flight_number.clone());
            } else {
                warn!(
                    flight = %record.flight_number,
                    conflicts = conflicts.len(),
                    "flight rejected"
                );
                failed_flights.push(FailedFlight {
                    flight_number: record.flight_number.clone(),
                    conflicts: conflicts.clone(),
                });
                all_conflicts.extend(conflicts);
            }
        }

        let summary = summarize(&all_conflicts);
        debug!(
            total = flights.len(),
            successful = successful_flights.len(),
            failed = failed_flights.len(),
            "schedule validated"
        );

        ValidationReport {
            total_flights: flights.len(),
            successful: successful_flights.len(),
            failed: failed_flights.len(),
            conflicts: all_conflicts,
            successful_flights,
            failed_flights,
            summary,
        }
    }

    /// Utilization figures for one airport, derived from the
    /// accumulated schedules without mutating them.
    pub fn airport_statistics(&self, airport: &str) -> AirportStats {
        let runway_operations = self
            .runway_schedules
            .get(airport)
            .map(Vec::len)
            .unwrap_or(0);
        let gate_reservations = self.gate_schedules.get(airport).map(Vec::len).unwrap_or(0);
        let gate_capacity = self.config.gates_at(airport);
        let utilization_pct = if gate_capacity > 0 {
            gate_reservations as f64 / gate_capacity as f64 * 100.0
        } else {
            0.0
        };

        AirportStats {
            airport: airport.to_string(),
            runway_operations,
            gate_reservations,
            gate_capacity,
            utilization_pct,
        }
    }

    /// Number of flights committed so far.
    pub fn active_flight_count(&self) -> usize {
        self.active_flights.len()
    }

    /// Clear all three schedules and the active set so the instance
    /// can be reused for an independent validation run.
    pub fn reset(&mut self) {
        self.aircraft_schedules.clear();
        self.runway_schedules.clear();
        self.gate_schedules.clear();
        self.active_flights.clear();
    }
}

fn summarize(conflicts: &[Conflict]) -> ConflictSummary {
    let mut summary = ConflictSummary::default();
    for conflict in conflicts {
        match conflict.kind {
            ConflictKind::Aircraft => summary.aircraft_conflicts += 1,
            ConflictKind::Runway => summary.runway_conflicts += 1,
            ConflictKind::Gate => summary.gate_conflicts += 1,
            ConflictKind::Positioning => summary.positioning_conflicts += 1,
            ConflictKind::InvalidTimes => {}
        }
    }
    summary
}
