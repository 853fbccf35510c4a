//! Parsing of named query locations from the command line and files.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use mobile_coverage::GeoPoint;

/// Split "name=value"
pub fn parse_named(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("Expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Empty location name in '{}'", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Parse "name=lat,lon"
pub fn parse_point(raw: &str) -> Result<(String, GeoPoint)> {
    let (name, coords) = parse_named(raw)?;
    let parts: Vec<f64> = coords
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("Invalid coordinates '{}'", coords))?;
    match parts.as_slice() {
        [lat, lon] => Ok((name, GeoPoint::new(*lat, *lon))),
        _ => anyhow::bail!("Expected lat,lon for '{}', got '{}'", name, coords),
    }
}

/// Location names key the output, so each must appear once
pub fn ensure_unique_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            anyhow::bail!("Duplicate location name '{}'", name);
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct PointRow {
    name: String,
    lat: f64,
    lon: f64,
}

/// Read a CSV with name,lat,lon columns
pub fn read_points_file(path: &Path) -> Result<Vec<(String, GeoPoint)>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open points file {}", path.display()))?;

    reader
        .deserialize::<PointRow>()
        .map(|row| {
            let row = row.with_context(|| format!("Malformed row in {}", path.display()))?;
            Ok((row.name, GeoPoint::new(row.lat, row.lon)))
        })
        .collect()
}
