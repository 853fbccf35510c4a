//! Operator and radio technology enumerations.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoverageError;

/// Mobile network operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Orange,
    Sfr,
    Bouygues,
    Free,
}

impl Operator {
    /// All known operators, in reporting order
    pub fn all() -> &'static [Operator] {
        &[
            Operator::Orange,
            Operator::Sfr,
            Operator::Bouygues,
            Operator::Free,
        ]
    }

    /// Lowercase identifier, as stored in the transmitter table
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Orange => "orange",
            Operator::Sfr => "sfr",
            Operator::Bouygues => "bouygues",
            Operator::Free => "free",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operator {
    type Err = CoverageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Operator::all()
            .iter()
            .copied()
            .find(|op| op.as_str() == name)
            .ok_or_else(|| CoverageError::UnknownOperator(s.to_string()))
    }
}

/// Radio generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Technology {
    #[serde(rename = "2G")]
    G2,
    #[serde(rename = "3G")]
    G3,
    #[serde(rename = "4G")]
    G4,
}

impl Technology {
    pub fn all() -> &'static [Technology] {
        &[Technology::G2, Technology::G3, Technology::G4]
    }

    /// Display name ("2G", "3G", "4G")
    pub const fn as_str(&self) -> &'static str {
        match self {
            Technology::G2 => "2G",
            Technology::G3 => "3G",
            Technology::G4 => "4G",
        }
    }

    /// Name of the capability flag column in the transmitter table
    pub const fn column(&self) -> &'static str {
        match self {
            Technology::G2 => "is2g",
            Technology::G3 => "is3g",
            Technology::G4 => "is4g",
        }
    }
}

impl std::fmt::Display for Technology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Technology {
    type Err = CoverageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "2G" => Ok(Technology::G2),
            "3G" => Ok(Technology::G3),
            "4G" => Ok(Technology::G4),
            _ => Err(CoverageError::UnknownTechnology(s.to_string())),
        }
    }
}
