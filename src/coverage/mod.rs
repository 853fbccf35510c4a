//! Transmitter coverage lookups.
//!
//! Builds one spherical R-tree per (operator, technology) group from the
//! prepared transmitter table and answers radius-membership queries.

mod index;
mod service;
mod store;
mod table;

pub use index::{haversine, CoverageIndex, SpherePoint, TransmitterIndex, EARTH_RADIUS_KM};
pub use service::CoverageService;
pub use store::{CoverageStore, TableSource};
pub use table::{TableStats, TransmitterTable, REQUIRED_COLUMNS};
