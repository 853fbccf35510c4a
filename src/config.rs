//! Process configuration, loaded once at startup.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::coverage::EARTH_RADIUS_KM;
use crate::error::{CoverageError, Result};
use crate::models::{Operator, Technology};

const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Prepared transmitter table
    pub table: PathBuf,
    /// Operators reported in coverage results
    pub operators: Vec<Operator>,
    pub radii: RadiusTable,
    pub bounds: Bounds,
    pub geocoder: GeocoderConfig,
}

/// Coverage radius per technology, in kilometers
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct RadiusTable {
    #[serde(rename = "2G")]
    pub g2: f64,
    #[serde(rename = "3G")]
    pub g3: f64,
    #[serde(rename = "4G")]
    pub g4: f64,
}

/// Inclusive lat/lon box used to filter raw transmitter data
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    pub url: String,
    pub user_agent: String,
    /// Comma-separated ISO country codes to restrict results to
    pub country_codes: Option<String>,
    /// Minimum spacing between two requests
    pub min_delay_ms: u64,
    pub timeout_secs: u64,
}

impl RadiusTable {
    pub fn km(&self, tech: Technology) -> f64 {
        match tech {
            Technology::G2 => self.g2,
            Technology::G3 => self.g3,
            Technology::G4 => self.g4,
        }
    }

    /// Radius as an angle on the unit sphere
    pub fn radians(&self, tech: Technology) -> f64 {
        self.km(tech) / EARTH_RADIUS_KM
    }

    /// Copy with one technology's radius replaced
    pub fn with(mut self, tech: Technology, km: f64) -> Self {
        match tech {
            Technology::G2 => self.g2 = km,
            Technology::G3 => self.g3 = km,
            Technology::G4 => self.g4 = km,
        }
        self
    }
}

impl Default for RadiusTable {
    fn default() -> Self {
        Self {
            g2: 30.0,
            g3: 5.0,
            g4: 10.0,
        }
    }
}

impl Bounds {
    /// Metropolitan France
    pub fn france() -> Self {
        Self {
            min_lat: 41.0,
            max_lat: 52.0,
            min_lon: -5.0,
            max_lon: 10.0,
        }
    }

    pub fn rect(&self) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::coord! { x: self.min_lon, y: self.min_lat },
            geo::coord! { x: self.max_lon, y: self.max_lat },
        )
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::france()
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: NOMINATIM_SEARCH_URL.to_string(),
            user_agent: "mobile-coverage/0.1".to_string(),
            country_codes: Some("fr".to_string()),
            min_delay_ms: 1000,
            timeout_secs: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table: PathBuf::from("data/towers.csv"),
            operators: Operator::all().to_vec(),
            radii: RadiusTable::default(),
            bounds: Bounds::default(),
            geocoder: GeocoderConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| CoverageError::io(path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        for tech in Technology::all() {
            let km = self.radii.km(*tech);
            if !km.is_finite() || km < 0.0 {
                return Err(CoverageError::InvalidConfig(format!(
                    "radius for {} must be a non-negative number of kilometers, got {}",
                    tech, km
                )));
            }
        }

        let b = &self.bounds;
        if b.min_lat > b.max_lat || b.min_lon > b.max_lon {
            return Err(CoverageError::InvalidConfig(format!(
                "bounds are not ordered: lat {}..{}, lon {}..{}",
                b.min_lat, b.max_lat, b.min_lon, b.max_lon
            )));
        }

        if self.operators.is_empty() {
            return Err(CoverageError::InvalidConfig(
                "at least one operator must be configured".to_string(),
            ));
        }

        Ok(())
    }
}
