//! touchdown - correlates X-Plane logbook flights with landing sensor logs
//!
//! The logbook and the landing sensor log are written by different
//! components and share no identifier. This library groups both record
//! streams by (calendar day, normalized aircraft code) and attributes
//! landings to flights through a cascade of heuristics, honoring manual
//! overrides first, with every link tagged by the rule that produced it.

pub mod aircraft;
pub mod analytics;
pub mod landing_log;
pub mod link_engine;
pub mod log_watcher;
pub mod logbook;
pub mod records;
pub mod settings;
pub mod state;

pub use link_engine::{LandingLink, LinkConfidence, LinkMaps, recompute_links};
pub use records::{FlightRecord, LandingRecord, LandingTime};
pub use settings::LinkSettings;
pub use state::AppState;
