//! Raw transmitter export parsing and cleanup.

use anyhow::{Context, Result};
use csv::StringRecord;
use geo::{Intersects, Point, Rect};
use regex::Regex;

use mobile_coverage::models::transmitter::parse_flag;
use mobile_coverage::{Operator, Transmitter};

/// Accepted header names for each canonical column
const COLUMN_ALIASES: [(&str, &[&str]); 6] = [
    ("operator", &["operator", "operateur", "opérateur"]),
    ("lat", &["lat", "latitude"]),
    ("lon", &["lon", "lng", "longitude"]),
    ("is2g", &["is2g", "2g"]),
    ("is3g", &["is3g", "3g"]),
    ("is4g", &["is4g", "4g"]),
];

/// Positions of the canonical columns in a raw header row
#[derive(Debug, Clone, Copy)]
pub struct ColumnMap {
    operator: usize,
    lat: usize,
    lon: usize,
    flags: [usize; 3],
}

impl ColumnMap {
    pub fn from_headers(headers: &StringRecord) -> Result<Self> {
        let mut found = [None; 6];
        let mut missing = Vec::new();

        for (slot, (canonical, aliases)) in COLUMN_ALIASES.iter().enumerate() {
            found[slot] = headers
                .iter()
                .position(|h| aliases.contains(&h.trim().to_lowercase().as_str()));
            if found[slot].is_none() {
                missing.push(*canonical);
            }
        }

        match found {
            [Some(operator), Some(lat), Some(lon), Some(g2), Some(g3), Some(g4)] => Ok(Self {
                operator,
                lat,
                lon,
                flags: [g2, g3, g4],
            }),
            _ => anyhow::bail!("Missing columns in raw file: {}", missing.join(", ")),
        }
    }
}

/// Why a raw row was not kept
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    UnknownOperator(String),
    OutOfBounds,
}

/// Maps free-form operator labels onto configured operators
pub struct OperatorNormalizer {
    leading_word: Regex,
    allowed: Vec<Operator>,
}

impl OperatorNormalizer {
    pub fn new(allowed: &[Operator]) -> Self {
        Self {
            leading_word: Regex::new(r"^[a-z]+").expect("static regex"),
            allowed: allowed.to_vec(),
        }
    }

    /// "Bouygues Telecom" -> bouygues, "Free Mobile" -> free
    pub fn normalize(&self, raw: &str) -> Option<Operator> {
        let lowered = raw.trim().to_lowercase();
        let word = self.leading_word.find(&lowered)?.as_str();
        let op: Operator = word.parse().ok()?;
        self.allowed.contains(&op).then_some(op)
    }
}

/// Turns raw rows into transmitters, applying operator and bounds filters
pub struct RowCleaner {
    columns: ColumnMap,
    operators: OperatorNormalizer,
    bounds: Rect<f64>,
}

impl RowCleaner {
    pub fn new(columns: ColumnMap, operators: OperatorNormalizer, bounds: Rect<f64>) -> Self {
        Self {
            columns,
            operators,
            bounds,
        }
    }

    /// `Ok(Err(_))` is a row dropped on purpose; `Err(_)` is a malformed row
    pub fn clean(
        &self,
        record: &StringRecord,
    ) -> Result<std::result::Result<Transmitter, Rejection>> {
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let raw_operator = field(self.columns.operator);
        let Some(operator) = self.operators.normalize(raw_operator) else {
            return Ok(Err(Rejection::UnknownOperator(raw_operator.to_string())));
        };

        let lat: f64 = field(self.columns.lat)
            .replace(',', ".")
            .parse()
            .with_context(|| format!("Invalid latitude '{}'", field(self.columns.lat)))?;
        let lon: f64 = field(self.columns.lon)
            .replace(',', ".")
            .parse()
            .with_context(|| format!("Invalid longitude '{}'", field(self.columns.lon)))?;

        if !Point::new(lon, lat).intersects(&self.bounds) {
            return Ok(Err(Rejection::OutOfBounds));
        }

        let mut flags = [false; 3];
        for (flag, idx) in flags.iter_mut().zip(self.columns.flags) {
            *flag = parse_flag(field(idx))
                .with_context(|| format!("Invalid capability flag '{}'", field(idx)))?;
        }

        Ok(Ok(Transmitter {
            operator,
            lat,
            lon,
            is2g: flags[0],
            is3g: flags[1],
            is4g: flags[2],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mobile_coverage::config::Bounds;

    fn cleaner(headers: &[&str]) -> RowCleaner {
        let columns = ColumnMap::from_headers(&StringRecord::from(headers.to_vec())).unwrap();
        RowCleaner::new(
            columns,
            OperatorNormalizer::new(Operator::all()),
            Bounds::france().rect(),
        )
    }

    #[test]
    fn test_header_aliases() {
        let headers =
            StringRecord::from(vec!["Operateur", "Latitude", "Longitude", "2G", "3G", "4G"]);
        assert!(ColumnMap::from_headers(&headers).is_ok());

        let headers = StringRecord::from(vec!["Operateur", "x", "y", "2G", "3G", "4G"]);
        let err = ColumnMap::from_headers(&headers).unwrap_err().to_string();
        assert!(err.contains("lat"));
        assert!(err.contains("lon"));
    }

    #[test]
    fn test_operator_normalization() {
        let normalizer = OperatorNormalizer::new(Operator::all());
        assert_eq!(normalizer.normalize("Orange"), Some(Operator::Orange));
        assert_eq!(normalizer.normalize("Bouygues Telecom"), Some(Operator::Bouygues));
        assert_eq!(normalizer.normalize("Free Mobile"), Some(Operator::Free));
        assert_eq!(normalizer.normalize("SFR"), Some(Operator::Sfr));
        assert_eq!(normalizer.normalize("Digicel"), None);
        assert_eq!(normalizer.normalize(""), None);

        let only_orange = OperatorNormalizer::new(&[Operator::Orange]);
        assert_eq!(only_orange.normalize("Free Mobile"), None);
    }

    #[test]
    fn test_clean_row() {
        let cleaner = cleaner(&["Operateur", "lat", "lon", "2G", "3G", "4G"]);

        let row = StringRecord::from(vec!["Free Mobile", "48.8566", "2.3522", "0", "1", "1"]);
        let t = cleaner.clean(&row).unwrap().unwrap();
        assert_eq!(t.operator, Operator::Free);
        assert!(!t.is2g && t.is3g && t.is4g);

        let row = StringRecord::from(vec!["Orange", "48,8566", "2,3522", "1", "0", "0"]);
        let t = cleaner.clean(&row).unwrap().unwrap();
        assert_eq!(t.lat, 48.8566);
    }

    #[test]
    fn test_rejections() {
        let cleaner = cleaner(&["operator", "lat", "lon", "is2g", "is3g", "is4g"]);

        // Martinique, outside metropolitan bounds
        let row = StringRecord::from(vec!["orange", "14.6415", "-61.0242", "1", "1", "1"]);
        assert_eq!(cleaner.clean(&row).unwrap(), Err(Rejection::OutOfBounds));

        // Bounds are inclusive
        let row = StringRecord::from(vec!["orange", "52.0", "-5.0", "1", "1", "1"]);
        assert!(cleaner.clean(&row).unwrap().is_ok());

        let row = StringRecord::from(vec!["Digicel", "48.0", "2.0", "1", "1", "1"]);
        assert_eq!(
            cleaner.clean(&row).unwrap(),
            Err(Rejection::UnknownOperator("Digicel".to_string()))
        );
    }

    #[test]
    fn test_malformed_row() {
        let cleaner = cleaner(&["operator", "lat", "lon", "is2g", "is3g", "is4g"]);
        let row = StringRecord::from(vec!["orange", "north", "2.0", "1", "1", "1"]);
        assert!(cleaner.clean(&row).is_err());

        let row = StringRecord::from(vec!["orange", "48.0", "2.0", "yes-ish", "1", "1"]);
        assert!(cleaner.clean(&row).is_err());
    }
}
