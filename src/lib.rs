//! Mobile coverage - per-operator 2G/3G/4G coverage lookups from transmitter sites
//!
//! This library provides shared types and modules for the prepare and query binaries.

pub mod config;
pub mod coverage;
pub mod error;
pub mod geocoder;
pub mod models;

pub use config::Config;
pub use coverage::{CoverageService, CoverageStore, TableSource};
pub use error::CoverageError;
pub use models::{CoverageMatrix, GeoPoint, LocationReport, Operator, Technology, Transmitter};
