//! skylane - flight itinerary routing and schedule collision checks
//! over a CSV timetable.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use skylane_core::{
    find_optimal_path, read_records, CollisionDetector, FlightCatalog, FlightLeg, Objective,
    Preferences, Route, ValidationReport,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "skylane",
    version,
    about = "Multi-criteria flight routing and schedule collision detection"
)]
struct Cli {
    /// Path to the flight schedule CSV
    #[arg(long, global = true, default_value = "data/flights.csv")]
    data: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the best itinerary between two airports
    Route {
        /// Start airport code
        #[arg(long)]
        from: String,
        /// End airport code
        #[arg(long)]
        to: String,
        /// Objective to minimize, or all three
        #[arg(long, value_enum, default_value_t = ObjectiveArg::All)]
        objective: ObjectiveArg,
        /// Airline code to favor in scoring
        #[arg(long)]
        prefer: Option<String>,
        /// Airline code to exclude from itineraries
        #[arg(long)]
        avoid: Option<String>,
        /// Emit JSON instead of a human summary
        #[arg(long)]
        json: bool,
    },
    /// Validate the whole schedule for physical conflicts
    Validate {
        /// Emit the full report as JSON
        #[arg(long)]
        json: bool,
        /// How many failed flights to detail in the human summary
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show utilization statistics for one airport
    Stats {
        #[arg(long)]
        airport: String,
    },
    /// Audit all-pairs reachability of the network
    Connectivity,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ObjectiveArg {
    Cost,
    Time,
    Best,
    All,
}

impl ObjectiveArg {
    /// Selected objectives paired with their response-key names.
    fn selected(self) -> Vec<(&'static str, Objective)> {
        match self {
            ObjectiveArg::Cost => vec![("cheapest", Objective::Cost)],
            ObjectiveArg::Time => vec![("fastest", Objective::Time)],
            ObjectiveArg::Best => vec![("best", Objective::Best)],
            ObjectiveArg::All => vec![
                ("cheapest", Objective::Cost),
                ("fastest", Objective::Time),
                ("best", Objective::Best),
            ],
        }
    }
}

#[derive(Serialize)]
struct RouteResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<Vec<FlightLeg>>,
}

impl From<Option<Route>> for RouteResponse {
    fn from(route: Option<Route>) -> Self {
        match route {
            Some(route) => RouteResponse {
                status: "found",
                value: Some(route.value),
                path: Some(route.legs),
            },
            None => RouteResponse {
                status: "not_found",
                value: None,
                path: None,
            },
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Route {
            from,
            to,
            objective,
            prefer,
            avoid,
            json,
        } => {
            let catalog = build_catalog(&cli.data)?;
            let prefs = Preferences {
                preferred_airline: prefer,
                avoid_airline: avoid,
            };
            run_route(&catalog, &from, &to, objective, &prefs, json)
        }
        Command::Validate { json, limit } => {
            let records = load_records(&cli.data)?;
            let mut detector = CollisionDetector::new();
            let report = detector.validate_schedule(&records);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_validation_summary(&report, limit);
            }
            Ok(())
        }
        Command::Stats { airport } => {
            let records = load_records(&cli.data)?;
            let mut detector = CollisionDetector::new();
            detector.validate_schedule(&records);
            let stats = detector.airport_statistics(&airport.trim().to_uppercase());
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::Connectivity => {
            let catalog = build_catalog(&cli.data)?;
            run_connectivity(&catalog)
        }
    }
}

fn load_records(path: &PathBuf) -> Result<Vec<skylane_core::FlightRecord>> {
    let records = read_records(path)
        .with_context(|| format!("loading flight schedule from {}", path.display()))?;
    tracing::info!(records = records.len(), "schedule loaded");
    Ok(records)
}

fn build_catalog(path: &PathBuf) -> Result<FlightCatalog> {
    let catalog = FlightCatalog::build(path)
        .with_context(|| format!("building flight catalog from {}", path.display()))?;
    tracing::info!(
        airports = catalog.airport_count(),
        legs = catalog.leg_count(),
        "catalog built"
    );
    Ok(catalog)
}

fn run_route(
    catalog: &FlightCatalog,
    from: &str,
    to: &str,
    objective: ObjectiveArg,
    prefs: &Preferences,
    json: bool,
) -> Result<()> {
    let mut results = serde_json::Map::new();
    for (name, objective) in objective.selected() {
        let route = find_optimal_path(catalog, from, to, objective, prefs);
        if !json {
            print_route(name, &route);
        }
        results.insert(
            name.to_string(),
            serde_json::to_value(RouteResponse::from(route))?,
        );
    }
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::Value::Object(results))?
        );
    }
    Ok(())
}

fn print_route(name: &str, route: &Option<Route>) {
    match route {
        Some(route) if route.legs.is_empty() => {
            println!("{name}: already there (value 0)");
        }
        Some(route) => {
            println!("{name}: value {:.1}, {} leg(s)", route.value, route.legs.len());
            for leg in &route.legs {
                println!(
                    "  {} {} {} -> {}  dep {}  arr {}  cost {}",
                    leg.airline,
                    leg.flight_number,
                    leg.source,
                    leg.destination,
                    leg.departure_utc.format("%Y-%m-%d %H:%M"),
                    leg.arrival_utc.format("%Y-%m-%d %H:%M"),
                    leg.cost
                );
            }
        }
        None => println!("{name}: no admissible itinerary"),
    }
}

fn print_validation_summary(report: &ValidationReport, limit: usize) {
    println!("total flights analyzed: {}", report.total_flights);
    println!("successfully scheduled: {}", report.successful);
    println!("conflicts detected:     {}", report.failed);
    println!();
    println!("aircraft/turnaround conflicts: {}", report.summary.aircraft_conflicts);
    println!("runway conflicts:              {}", report.summary.runway_conflicts);
    println!("gate conflicts:                {}", report.summary.gate_conflicts);
    println!("positioning conflicts:         {}", report.summary.positioning_conflicts);

    if report.failed == 0 {
        println!();
        println!("no conflicts detected, schedule is valid");
        return;
    }

    println!();
    for (i, failed) in report.failed_flights.iter().take(limit).enumerate() {
        println!("{}. flight {}", i + 1, failed.flight_number);
        for conflict in &failed.conflicts {
            println!("   {conflict}");
        }
    }
    if report.failed > limit {
        println!("... and {} more flights with conflicts", report.failed - limit);
    }
}

fn run_connectivity(catalog: &FlightCatalog) -> Result<()> {
    let airports: Vec<&str> = catalog.airports().collect();
    let mut missing = Vec::new();

    println!("{} airports: {}", airports.len(), airports.join(", "));
    for &start in &airports {
        for &end in &airports {
            if start == end {
                continue;
            }
            match find_optimal_path(catalog, start, end, Objective::Cost, &Preferences::default())
            {
                Some(route) => {
                    println!("{start} -> {end}: {} hop(s)", route.legs.len());
                }
                None => {
                    println!("{start} -> {end}: NO PATH");
                    missing.push((start, end));
                }
            }
        }
    }

    if missing.is_empty() {
        println!("all airports connected");
        Ok(())
    } else {
        println!("{} missing route(s)", missing.len());
        std::process::exit(1);
    }
}
