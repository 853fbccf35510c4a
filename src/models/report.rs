//! Coverage results as returned to callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Operator, Technology};

/// Coverage flags: operator -> technology -> covered.
///
/// Keys iterate in `Operator::all()` / `Technology::all()` order whatever the
/// configured operator order.
pub type CoverageMatrix = BTreeMap<Operator, BTreeMap<Technology, bool>>;

/// Result for one named location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationReport {
    Coverage(CoverageMatrix),
    Error { error: String },
}

impl LocationReport {
    pub fn error(message: impl Into<String>) -> Self {
        LocationReport::Error {
            error: message.into(),
        }
    }

    /// Number of covered (operator, technology) pairs
    pub fn covered_count(&self) -> usize {
        match self {
            LocationReport::Coverage(matrix) => matrix
                .values()
                .flat_map(|techs| techs.values())
                .filter(|covered| **covered)
                .count(),
            LocationReport::Error { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serialization_shape() {
        let mut matrix = CoverageMatrix::new();
        matrix
            .entry(Operator::Orange)
            .or_default()
            .insert(Technology::G4, true);
        let json = serde_json::to_value(LocationReport::Coverage(matrix)).unwrap();
        assert_eq!(json, serde_json::json!({"orange": {"4G": true}}));

        let json = serde_json::to_value(LocationReport::error("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "boom"}));
    }
}
