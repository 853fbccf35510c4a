//! Transmitter records as stored in the prepared table.

use serde::{Deserialize, Deserializer, Serialize};

use super::{Operator, Technology};

/// Geographic point (lat/lon, degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A single transmitter site.
///
/// Several transmitters may share a location; the table carries no
/// uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transmitter {
    pub operator: Operator,
    pub lat: f64,
    pub lon: f64,
    #[serde(deserialize_with = "deserialize_flag")]
    pub is2g: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub is3g: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub is4g: bool,
}

impl Transmitter {
    pub fn new(operator: Operator, lat: f64, lon: f64) -> Self {
        Self {
            operator,
            lat,
            lon,
            is2g: false,
            is3g: false,
            is4g: false,
        }
    }

    /// Set the capability flag for a technology (builder style)
    pub fn with(mut self, tech: Technology) -> Self {
        match tech {
            Technology::G2 => self.is2g = true,
            Technology::G3 => self.is3g = true,
            Technology::G4 => self.is4g = true,
        }
        self
    }

    /// Whether this transmitter provides the given technology
    pub fn supports(&self, tech: Technology) -> bool {
        match tech {
            Technology::G2 => self.is2g,
            Technology::G3 => self.is3g,
            Technology::G4 => self.is4g,
        }
    }
}

/// Parse a capability flag written either as a boolean or as 0/1
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" => Some(true),
        "0" | "false" | "f" | "no" | "" => Some(false),
        _ => None,
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flag(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid capability flag '{}'", raw)))
}
