//! Core data models for the coverage system.

pub mod network;
pub mod report;
pub mod transmitter;

pub use network::{Operator, Technology};
pub use report::{CoverageMatrix, LocationReport};
pub use transmitter::{GeoPoint, Transmitter};
