pub mod catalog;
pub mod collision;
pub mod models;
pub mod routing;

pub use catalog::{read_records, CatalogError, FlightCatalog};
pub use collision::{
    AirportStats, CollisionDetector, Conflict, ConflictKind, ConflictSummary, DetectorConfig,
    FailedFlight, ValidationReport,
};
pub use models::{FlightLeg, FlightRecord, Objective, Preferences};
pub use routing::{find_optimal_path, Route, MINIMUM_LAYOVER_MINUTES};
