//! Offline preparation of the transmitter table.
//!
//! Reads a raw transmitter export (already in WGS84 lat/lon), normalizes
//! operator names, drops rows outside the configured bounds and writes the
//! table the query side loads.

mod raw;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mobile_coverage::coverage::TransmitterTable;
use mobile_coverage::Config;

use crate::raw::{ColumnMap, OperatorNormalizer, Rejection, RowCleaner};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "prepare")]
#[command(about = "Build the transmitter table from a raw export")]
struct Args {
    /// Raw transmitter CSV (optionally .gz)
    #[arg(short, long)]
    input: PathBuf,

    /// Output table; defaults to the configured table path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, default_value = "coverage.toml")]
    config: PathBuf,

    /// Field delimiter of the raw file
    #[arg(long, default_value_t = ';')]
    delimiter: char,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    let output = args.output.clone().unwrap_or_else(|| config.table.clone());

    info!("Transmitter table preparation");
    info!("Input: {}", args.input.display());
    info!("Output: {}", output.display());

    if !args.delimiter.is_ascii() {
        anyhow::bail!("Delimiter must be a single ASCII character");
    }

    let file = File::open(&args.input)
        .with_context(|| format!("Raw file not found: {}", args.input.display()))?;
    let total_bytes = file.metadata().map(|m| m.len()).unwrap_or(0);

    let pb = ProgressBar::new(total_bytes);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes}",
            )?
            .progress_chars("#>-"),
    );

    let source = pb.wrap_read(BufReader::new(file));
    let reader: Box<dyn Read> = if args.input.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(source))
    } else {
        Box::new(source)
    };

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(args.delimiter as u8)
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnMap::from_headers(csv_reader.headers()?)?;
    let cleaner = RowCleaner::new(
        columns,
        OperatorNormalizer::new(&config.operators),
        config.bounds.rect(),
    );

    let mut transmitters = Vec::new();
    let mut read = 0usize;
    let mut unknown_operator = 0usize;
    let mut out_of_bounds = 0usize;

    for (line, result) in csv_reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", line + 2))?;
        read += 1;
        match cleaner
            .clean(&record)
            .with_context(|| format!("Malformed row {}", line + 2))?
        {
            Ok(t) => transmitters.push(t),
            Err(Rejection::UnknownOperator(_)) => unknown_operator += 1,
            Err(Rejection::OutOfBounds) => out_of_bounds += 1,
        }
    }
    pb.finish_and_clear();

    info!("Rows read: {}", read);
    if unknown_operator > 0 {
        warn!(
            "{} transmitters of unconfigured operators were dropped",
            unknown_operator
        );
    }
    if out_of_bounds > 0 {
        warn!(
            "{} transmitters outside the configured bounds were dropped",
            out_of_bounds
        );
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let table = TransmitterTable::new(transmitters);
    table.write(&output)?;
    table.stats().log();
    info!("Table fingerprint {:016x}", table.fingerprint());

    Ok(())
}
