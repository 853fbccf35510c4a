//! Prepared transmitter table: loading, writing, fingerprinting.

use csv::{ReaderBuilder, WriterBuilder};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;
use xxhash_rust::xxh64::Xxh64;

use crate::error::{CoverageError, Result};
use crate::models::{Operator, Technology, Transmitter};

/// Columns every prepared table must carry, in written order
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "operator",
    "lat",
    "lon",
    Technology::G2.column(),
    Technology::G3.column(),
    Technology::G4.column(),
];

fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |e| e == "gz")
}

/// Per-operator and per-technology transmitter counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableStats {
    pub total: usize,
    pub per_operator: BTreeMap<Operator, usize>,
    pub per_technology: BTreeMap<Technology, usize>,
}

impl TableStats {
    pub fn log(&self) {
        info!("Total transmitters: {}", self.total);
        for (op, count) in &self.per_operator {
            info!("  {}: {}", op, count);
        }
        for (tech, count) in &self.per_technology {
            info!("  {}: {} transmitters", tech, count);
        }
    }
}

/// The immutable transmitter table the coverage index is built from
#[derive(Debug, Clone, Default)]
pub struct TransmitterTable {
    transmitters: Vec<Transmitter>,
}

impl TransmitterTable {
    pub fn new(transmitters: Vec<Transmitter>) -> Self {
        Self { transmitters }
    }

    /// Load a prepared table (CSV, optionally gzip-compressed)
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading transmitter table from {}", path.display());

        let file = File::open(path).map_err(|e| CoverageError::io(path, e))?;
        let reader: Box<dyn Read> = if is_gzip(path) {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let table = Self::from_reader(reader, path)?;
        info!("Loaded {} transmitters", table.len());
        Ok(table)
    }

    /// Decode a table from any reader; `path` is only used in error messages
    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| CoverageError::csv(path, e))?
            .clone();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h == **col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CoverageError::MissingColumns {
                path: path.to_path_buf(),
                columns: missing,
            });
        }

        let transmitters = csv_reader
            .deserialize::<Transmitter>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| CoverageError::csv(path, e))?;

        Ok(Self { transmitters })
    }

    /// Write the table with the canonical column layout
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| CoverageError::io(path, e))?;
        let writer: Box<dyn Write> = if is_gzip(path) {
            Box::new(GzEncoder::new(BufWriter::new(file), Compression::default()))
        } else {
            Box::new(BufWriter::new(file))
        };

        // Header is written up front so an empty table still loads back
        let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
        csv_writer
            .write_record(REQUIRED_COLUMNS)
            .map_err(|e| CoverageError::csv(path, e))?;
        for t in &self.transmitters {
            csv_writer
                .serialize(t)
                .map_err(|e| CoverageError::csv(path, e))?;
        }
        csv_writer.flush().map_err(|e| CoverageError::io(path, e))?;

        info!(
            "Wrote {} transmitters to {}",
            self.transmitters.len(),
            path.display()
        );
        Ok(())
    }

    pub fn transmitters(&self) -> &[Transmitter] {
        &self.transmitters
    }

    pub fn len(&self) -> usize {
        self.transmitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transmitters.is_empty()
    }

    /// Content hash identifying this table; row order is significant
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh64::new(0);
        for t in &self.transmitters {
            hasher.update(t.operator.as_str().as_bytes());
            hasher.update(&t.lat.to_bits().to_le_bytes());
            hasher.update(&t.lon.to_bits().to_le_bytes());
            hasher.update(&[t.is2g as u8, t.is3g as u8, t.is4g as u8]);
        }
        hasher.digest()
    }

    pub fn stats(&self) -> TableStats {
        let mut stats = TableStats {
            total: self.transmitters.len(),
            ..Default::default()
        };
        for t in &self.transmitters {
            *stats.per_operator.entry(t.operator).or_default() += 1;
            for tech in Technology::all() {
                if t.supports(*tech) {
                    *stats.per_technology.entry(*tech).or_default() += 1;
                }
            }
        }
        stats
    }
}
