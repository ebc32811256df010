//! Indicator trait and the named series it produces.
//!
//! Indicators are pure functions: full table in, one or more derived numeric
//! series out. Each series carries exactly one value per table row; the
//! registry rejects anything else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::descriptor::Descriptor;
use crate::domain::{ContractError, Table};

/// A named derived column produced by an indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No output value at row t may depend on rows t+1 or later.
pub trait Indicator: Send + Sync {
    /// Identity used for deduplication: kind plus every parameter.
    fn descriptor(&self) -> Descriptor;

    /// Names of the columns `compute` writes, in output order.
    fn columns(&self) -> Vec<String>;

    /// Number of rows needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute every output series over the whole table.
    fn compute(&self, table: &Table) -> Result<Vec<Series>, ContractError>;
}

/// Base price column an indicator reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
    AdjClose,
}

impl PriceSource {
    pub const ALL: [PriceSource; 5] = [
        PriceSource::Open,
        PriceSource::High,
        PriceSource::Low,
        PriceSource::Close,
        PriceSource::AdjClose,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Open => "open",
            PriceSource::High => "high",
            PriceSource::Low => "low",
            PriceSource::Close => "close",
            PriceSource::AdjClose => "adj_close",
        }
    }

    /// The source column of `table`; `required_by` names the reader in errors.
    pub fn read<'a>(&self, table: &'a Table, required_by: &str) -> Result<&'a [f64], ContractError> {
        table.require_numeric(self.as_str(), required_by)
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PriceSource::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                format!("unknown price source '{s}' (expected open, high, low, close or adj_close)")
            })
    }
}
