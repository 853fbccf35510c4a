//! Coverage query tool.
//!
//! Resolves named points (coordinates or addresses) and prints the
//! operator/technology coverage matrix for each as JSON.

mod locations;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mobile_coverage::geocoder::{resolve_locations, NominatimGeocoder};
use mobile_coverage::{
    Config, CoverageService, CoverageStore, GeoPoint, LocationReport, TableSource, Technology,
};

use crate::locations::{ensure_unique_names, parse_named, parse_point, read_points_file};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Mobile coverage lookup")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "coverage.toml")]
    config: PathBuf,

    /// Transmitter table (overrides the configured one)
    #[arg(short, long)]
    table: Option<PathBuf>,

    /// Named coordinate: "name=lat,lon"
    #[arg(short, long = "point")]
    points: Vec<String>,

    /// Named address to geocode: "name=address"
    #[arg(short, long = "address")]
    addresses: Vec<String>,

    /// CSV file with name,lat,lon columns
    #[arg(long)]
    points_file: Option<PathBuf>,

    /// Include the distance to the nearest transmitter of each group
    #[arg(long)]
    explain: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct QueryResponse {
    results: BTreeMap<String, LocationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nearest_km: Option<NearestReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    let table = args.table.clone().unwrap_or_else(|| config.table.clone());

    let mut named_points: Vec<(String, GeoPoint)> = Vec::new();
    for raw in &args.points {
        named_points.push(parse_point(raw)?);
    }
    if let Some(path) = &args.points_file {
        named_points.extend(read_points_file(path)?);
    }
    let addresses = args
        .addresses
        .iter()
        .map(|raw| parse_named(raw))
        .collect::<Result<Vec<_>>>()?;

    ensure_unique_names(
        named_points
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(addresses.iter().map(|(name, _)| name.as_str())),
    )?;

    if named_points.is_empty() && addresses.is_empty() {
        anyhow::bail!("Nothing to query: pass --point, --address or --points-file");
    }

    // Build eagerly so a bad table fails before any lookup
    info!("Coverage radii (km): {:?}", config.radii);
    let store = CoverageStore::new(
        TableSource::File(table.clone()),
        config.radii,
        config.operators.clone(),
    );
    let service = store
        .service()
        .with_context(|| format!("Failed to load transmitter table {}", table.display()))?;

    let mut results: BTreeMap<String, LocationReport> = BTreeMap::new();

    if !addresses.is_empty() {
        let geocoder = NominatimGeocoder::new(&config.geocoder)?;
        for (name, resolved) in resolve_locations(&geocoder, &addresses).await {
            match resolved {
                Ok(point) => named_points.push((name, point)),
                Err(message) => {
                    results.insert(name, LocationReport::error(message));
                }
            }
        }
    }

    let nearest_km = args
        .explain
        .then(|| explain(&service, &named_points));

    let computed = {
        let service = Arc::clone(&service);
        let points = named_points.clone();
        tokio::task::spawn_blocking(move || service.coverage_batch(&points)).await?
    };
    for (name, matrix) in computed {
        results.insert(name, LocationReport::Coverage(matrix));
    }

    let covered: usize = results.values().map(LocationReport::covered_count).sum();
    info!(
        "Computed coverage for {} locations ({} covered pairs)",
        results.len(),
        covered
    );

    let response = QueryResponse {
        results,
        nearest_km,
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", json);

    Ok(())
}

type NearestReport = BTreeMap<String, BTreeMap<String, BTreeMap<Technology, Option<f64>>>>;

fn explain(service: &CoverageService, points: &[(String, GeoPoint)]) -> NearestReport {
    points
        .iter()
        .map(|(name, p)| {
            let per_operator: BTreeMap<String, BTreeMap<Technology, Option<f64>>> = service
                .operators()
                .iter()
                .map(|op| {
                    let per_tech: BTreeMap<Technology, Option<f64>> = Technology::all()
                        .iter()
                        .map(|tech| (*tech, service.nearest_km(p.lat, p.lon, *op, *tech)))
                        .collect();
                    (op.to_string(), per_tech)
                })
                .collect();
            (name.clone(), per_operator)
        })
        .collect()
}
