//! Time-expanded, preference-weighted shortest-path search.
//!
//! States are (airport, arrival-time) pairs rather than plain
//! airports: layover admissibility depends on when the traveler
//! arrives, so the same airport must be revisitable at different
//! times with independent values.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::FlightCatalog;
use crate::models::{normalize_airport, FlightLeg, Objective, Preferences};

/// Minimum ground time between consecutive legs of an itinerary. Does
/// not apply to the first leg.
pub const MINIMUM_LAYOVER_MINUTES: i64 = 45;

/// Fare weight in the blended `Best` score.
const BEST_COST_WEIGHT: f64 = 2.0;
/// Scale applied to a preferred-airline leg's blended score.
const BEST_PREFERRED_SCALE: f64 = 0.8;
/// Scale applied to a preferred-airline leg's fare under `Cost`.
const COST_PREFERRED_SCALE: f64 = 0.9;

/// A found itinerary and its optimized value.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub legs: Vec<FlightLeg>,
    pub value: f64,
}

/// `f64` with a total order, for heap keys.
#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Search label: where we are, when we got there, and how.
#[derive(Debug, Clone)]
struct Label<'a> {
    value: FloatOrd,
    /// Monotone insertion counter; strict tie-break so equal values
    /// pop in insertion order and the search stays deterministic.
    seq: u64,
    airport: String,
    arrival_utc: DateTime<Utc>,
    legs: Vec<&'a FlightLeg>,
}

impl PartialEq for Label<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.seq == other.seq
    }
}

impl Eq for Label<'_> {}

impl PartialOrd for Label<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Find the best itinerary from `start` to `end` under an objective.
///
/// Returns `None` when no admissible path exists; `start == end`
/// yields the trivial empty itinerary with value 0. All per-leg
/// increments are non-negative, so the first time the destination is
/// popped its label is optimal.
pub fn find_optimal_path(
    catalog: &FlightCatalog,
    start: &str,
    end: &str,
    objective: Objective,
    prefs: &Preferences,
) -> Option<Route> {
    let start = normalize_airport(start);
    let end = normalize_airport(end);

    if start == end {
        return Some(Route {
            legs: Vec::new(),
            value: 0.0,
        });
    }
    if catalog.outbound(&start).is_empty() {
        return None;
    }

    let mut heap: BinaryHeap<Reverse<Label>> = BinaryHeap::new();
    let mut finalized: HashMap<(String, DateTime<Utc>), f64> = HashMap::new();
    let mut seq = 0u64;

    // Sentinel arrival earlier than any real timestamp, so the first
    // leg never hits the layover constraint.
    heap.push(Reverse(Label {
        value: FloatOrd(0.0),
        seq,
        airport: start,
        arrival_utc: DateTime::<Utc>::MIN_UTC,
        legs: Vec::new(),
    }));

    while let Some(Reverse(label)) = heap.pop() {
        let key = (label.airport.clone(), label.arrival_utc);
        if finalized.get(&key).is_some_and(|&best| best <= label.value.0) {
            continue;
        }
        finalized.insert(key, label.value.0);

        if label.airport == end {
            return Some(Route {
                legs: label.legs.into_iter().cloned().collect(),
                value: label.value.0,
            });
        }

        for leg in catalog.outbound(&label.airport) {
            if prefs.avoids(&leg.airline) {
                continue;
            }
            let layover_minutes = (leg.departure_utc - label.arrival_utc).num_minutes();
            if !label.legs.is_empty() && layover_minutes < MINIMUM_LAYOVER_MINUTES {
                continue;
            }

            let value = score(&label, leg, layover_minutes, objective, prefs);
            seq += 1;
            let mut legs = label.legs.clone();
            legs.push(leg);
            heap.push(Reverse(Label {
                value: FloatOrd(value),
                seq,
                airport: leg.destination.clone(),
                arrival_utc: leg.arrival_utc,
                legs,
            }));
        }
    }

    None
}

fn score(
    label: &Label,
    leg: &FlightLeg,
    layover_minutes: i64,
    objective: Objective,
    prefs: &Preferences,
) -> f64 {
    match objective {
        Objective::Cost => {
            let mut fare = f64::from(leg.cost);
            if prefs.prefers(&leg.airline) {
                fare *= COST_PREFERRED_SCALE;
            }
            label.value.0 + fare
        }
        Objective::Time => {
            // Not additive: the value is recomputed as total elapsed
            // minutes from the itinerary's first departure, so ground
            // time between legs counts too.
            let first_departure = label
                .legs
                .first()
                .map(|first| first.departure_utc)
                .unwrap_or(leg.departure_utc);
            (leg.arrival_utc - first_departure).num_minutes() as f64
        }
        Objective::Best => {
            let layover = if label.legs.is_empty() {
                0
            } else {
                layover_minutes
            };
            let mut increment = (leg.duration_minutes() + layover) as f64
                + f64::from(leg.cost) * BEST_COST_WEIGHT;
            if prefs.prefers(&leg.airline) {
                increment *= BEST_PREFERRED_SCALE;
            }
            label.value.0 + increment
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlightRecord;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, day, hour, minute, 0).unwrap()
    }

    fn record(
        number: &str,
        airline: &str,
        source: &str,
        destination: &str,
        departure: DateTime<Utc>,
        arrival: DateTime<Utc>,
        cost: u32,
    ) -> FlightRecord {
        FlightRecord {
            flight_number: number.to_string(),
            airline: airline.to_string(),
            aircraft_type: "B777".to_string(),
            source: source.to_string(),
            destination: destination.to_string(),
            departure_utc: Some(departure),
            arrival_utc: Some(arrival),
            cost: Some(cost),
        }
    }

    fn catalog(records: &[FlightRecord]) -> FlightCatalog {
        FlightCatalog::from_records(records).unwrap()
    }

    fn flight_numbers(route: &Route) -> Vec<&str> {
        route.legs.iter().map(|l| l.flight_number.as_str()).collect()
    }

    #[test]
    fn same_airport_is_trivial_empty_route() {
        let catalog = catalog(&[record(
            "AA1",
            "AA",
            "JFK",
            "SFO",
            at(28, 9, 0),
            at(28, 15, 0),
            300,
        )]);
        let route =
            find_optimal_path(&catalog, "JFK", "JFK", Objective::Cost, &Preferences::default())
                .unwrap();
        assert!(route.legs.is_empty());
        assert_eq!(route.value, 0.0);
    }

    #[test]
    fn no_outbound_legs_means_no_path() {
        let catalog = catalog(&[record(
            "AA1",
            "AA",
            "JFK",
            "SFO",
            at(28, 9, 0),
            at(28, 15, 0),
            300,
        )]);
        // SFO exists but has no outbound edges.
        assert!(
            find_optimal_path(&catalog, "SFO", "JFK", Objective::Cost, &Preferences::default())
                .is_none()
        );
        // Unknown airports are a search miss, not an error.
        assert!(
            find_optimal_path(&catalog, "ZRH", "JFK", Objective::Cost, &Preferences::default())
                .is_none()
        );
    }

    #[test]
    fn cost_objective_picks_cheaper_connection_over_direct() {
        let catalog = catalog(&[
            record("DL100", "DL", "JFK", "LHR", at(28, 8, 0), at(28, 20, 0), 900),
            record("AA200", "AA", "JFK", "BOS", at(28, 7, 0), at(28, 8, 0), 100),
            record("AA201", "AA", "BOS", "LHR", at(28, 9, 0), at(28, 21, 0), 300),
        ]);
        let route =
            find_optimal_path(&catalog, "JFK", "LHR", Objective::Cost, &Preferences::default())
                .unwrap();
        assert_eq!(flight_numbers(&route), vec!["AA200", "AA201"]);
        assert_eq!(route.value, 400.0);
    }

    #[test]
    fn time_objective_counts_ground_time() {
        // The cheap connection takes 14h door to door, the expensive
        // direct takes 12h.
        let catalog = catalog(&[
            record("DL100", "DL", "JFK", "LHR", at(28, 8, 0), at(28, 20, 0), 900),
            record("AA200", "AA", "JFK", "BOS", at(28, 7, 0), at(28, 8, 0), 100),
            record("AA201", "AA", "BOS", "LHR", at(28, 9, 0), at(28, 21, 0), 300),
        ]);
        let route =
            find_optimal_path(&catalog, "JFK", "LHR", Objective::Time, &Preferences::default())
                .unwrap();
        assert_eq!(flight_numbers(&route), vec!["DL100"]);
        assert_eq!(route.value, 720.0);
    }

    #[test]
    fn layover_under_minimum_is_inadmissible() {
        // 44 minutes on the ground at BOS: one minute short.
        let tight = catalog(&[
            record("AA200", "AA", "JFK", "BOS", at(28, 7, 0), at(28, 8, 0), 100),
            record("AA201", "AA", "BOS", "LHR", at(28, 8, 44), at(28, 20, 0), 300),
        ]);
        assert!(
            find_optimal_path(&tight, "JFK", "LHR", Objective::Cost, &Preferences::default())
                .is_none()
        );

        // Exactly 45 minutes is admissible.
        let ok = catalog(&[
            record("AA200", "AA", "JFK", "BOS", at(28, 7, 0), at(28, 8, 0), 100),
            record("AA201", "AA", "BOS", "LHR", at(28, 8, 45), at(28, 20, 0), 300),
        ]);
        let route =
            find_optimal_path(&ok, "JFK", "LHR", Objective::Cost, &Preferences::default()).unwrap();
        assert_eq!(route.legs.len(), 2);
    }

    #[test]
    fn returned_itinerary_satisfies_layover_invariant() {
        let catalog = catalog(&[
            record("AA200", "AA", "JFK", "BOS", at(28, 7, 0), at(28, 8, 0), 100),
            record("AA201", "AA", "BOS", "AMS", at(28, 9, 0), at(28, 19, 0), 300),
            record("AA202", "AA", "AMS", "DXB", at(28, 20, 30), at(29, 3, 0), 250),
        ]);
        let route =
            find_optimal_path(&catalog, "JFK", "DXB", Objective::Best, &Preferences::default())
                .unwrap();
        for pair in route.legs.windows(2) {
            assert!(pair[0].destination == pair[1].source);
            let gap = (pair[1].departure_utc - pair[0].arrival_utc).num_minutes();
            assert!(gap >= MINIMUM_LAYOVER_MINUTES, "layover {gap} min too short");
        }
    }

    #[test]
    fn avoided_airline_is_strictly_excluded() {
        // EK offers the cheapest direct route but is avoided.
        let catalog = catalog(&[
            record("EK1", "EK", "JFK", "DXB", at(28, 8, 0), at(28, 21, 0), 400),
            record("BA2", "BA", "JFK", "LHR", at(28, 7, 0), at(28, 19, 0), 500),
            record("BA3", "BA", "LHR", "DXB", at(28, 20, 0), at(29, 3, 0), 450),
        ]);
        let prefs = Preferences {
            avoid_airline: Some("EK".to_string()),
            ..Default::default()
        };
        for objective in [Objective::Cost, Objective::Time, Objective::Best] {
            let route = find_optimal_path(&catalog, "JFK", "DXB", objective, &prefs).unwrap();
            assert!(
                route.legs.iter().all(|leg| leg.airline != "EK"),
                "{objective:?} route used the avoided airline"
            );
        }

        // Without the preference, EK wins on cost.
        let route =
            find_optimal_path(&catalog, "JFK", "DXB", Objective::Cost, &Preferences::default())
                .unwrap();
        assert_eq!(flight_numbers(&route), vec!["EK1"]);
    }

    #[test]
    fn avoiding_the_only_carrier_means_no_path() {
        let catalog = catalog(&[record(
            "EK1",
            "EK",
            "JFK",
            "DXB",
            at(28, 8, 0),
            at(28, 21, 0),
            400,
        )]);
        let prefs = Preferences {
            avoid_airline: Some("EK".to_string()),
            ..Default::default()
        };
        assert!(find_optimal_path(&catalog, "JFK", "DXB", Objective::Cost, &prefs).is_none());
    }

    #[test]
    fn preferred_airline_discount_can_change_the_winner() {
        // VS is nominally 50 more expensive; the 10% preferred
        // discount brings it under BA.
        let catalog = catalog(&[
            record("BA10", "BA", "JFK", "LHR", at(28, 8, 0), at(28, 20, 0), 500),
            record("VS11", "VS", "JFK", "LHR", at(28, 9, 0), at(28, 21, 0), 540),
        ]);
        let prefs = Preferences {
            preferred_airline: Some("VS".to_string()),
            ..Default::default()
        };
        let route = find_optimal_path(&catalog, "JFK", "LHR", Objective::Cost, &prefs).unwrap();
        assert_eq!(flight_numbers(&route), vec!["VS11"]);
        assert_eq!(route.value, 486.0);
    }

    #[test]
    fn cost_value_never_exceeds_alternative_itinerary_sum() {
        let catalog = catalog(&[
            record("DL100", "DL", "JFK", "LHR", at(28, 8, 0), at(28, 20, 0), 900),
            record("AA200", "AA", "JFK", "BOS", at(28, 7, 0), at(28, 8, 0), 100),
            record("AA201", "AA", "BOS", "LHR", at(28, 9, 0), at(28, 21, 0), 300),
        ]);
        let route =
            find_optimal_path(&catalog, "JFK", "LHR", Objective::Cost, &Preferences::default())
                .unwrap();
        // The direct DL100 itinerary is valid and costs 900.
        assert!(route.value <= 900.0);
    }

    #[test]
    fn repeated_searches_are_deterministic() {
        // Two equally priced options; the tie-break must always pick
        // the same one.
        let catalog = catalog(&[
            record("AA1", "AA", "JFK", "LHR", at(28, 8, 0), at(28, 20, 0), 500),
            record("DL2", "DL", "JFK", "LHR", at(28, 9, 0), at(28, 21, 0), 500),
        ]);
        let first =
            find_optimal_path(&catalog, "JFK", "LHR", Objective::Cost, &Preferences::default())
                .unwrap();
        for _ in 0..10 {
            let again =
                find_optimal_path(&catalog, "JFK", "LHR", Objective::Cost, &Preferences::default())
                    .unwrap();
            assert_eq!(flight_numbers(&again), flight_numbers(&first));
            assert_eq!(again.value, first.value);
        }
    }
}
