//! Table: the row-aligned candle collection that indicators and strategies augment.
//!
//! Rows are indexed 0..N-1 in timestamp order as delivered by the adapter.
//! The six base columns are materialized from the candles on construction and
//! are read-only afterwards. Derived columns are appended by indicators
//! (numeric) and strategies (signals); every derived column must carry exactly
//! N values, aligned positionally with the base rows.

use chrono::NaiveDateTime;

use super::candle::Candle;
use super::signal::Signal;

/// Base column names, in canonical order.
pub const BASE_COLUMNS: [&str; 6] = ["open", "high", "low", "close", "adj_close", "volume"];

/// Violations of the row-alignment contract between a table and the components
/// writing into it. These indicate a broken indicator or strategy and are never
/// silently repaired.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractError {
    #[error("column '{column}' has {actual} rows, table has {expected}")]
    Misaligned {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("column '{column}' required by '{required_by}' is not present")]
    MissingColumn { column: String, required_by: String },

    #[error("column '{column}' is not a {expected} column")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    #[error("base column '{column}' cannot be overwritten")]
    ProtectedColumn { column: String },
}

/// Values of a single named column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Signals(Vec<Signal>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Signals(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named, row-aligned candle table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    symbol: String,
    timestamps: Vec<NaiveDateTime>,
    columns: Vec<(String, ColumnData)>,
}

impl Table {
    /// An empty table with the base schema and zero rows.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self::from_candles(symbol, std::iter::empty())
    }

    /// Materialize a candle sequence into a table.
    pub fn from_candles(symbol: impl Into<String>, candles: impl IntoIterator<Item = Candle>) -> Self {
        let candles = candles.into_iter();
        let (lower, _) = candles.size_hint();

        let mut timestamps = Vec::with_capacity(lower);
        let mut base: [Vec<f64>; 6] = Default::default();
        for col in base.iter_mut() {
            col.reserve(lower);
        }

        for c in candles {
            timestamps.push(c.timestamp);
            base[0].push(c.open);
            base[1].push(c.high);
            base[2].push(c.low);
            base[3].push(c.close);
            base[4].push(c.adj_close);
            base[5].push(c.volume);
        }

        let columns = BASE_COLUMNS
            .iter()
            .zip(base)
            .map(|(name, values)| (name.to_string(), ColumnData::Numeric(values)))
            .collect();

        Self {
            symbol: symbol.into(),
            timestamps,
            columns,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Column names in insertion order (base columns first).
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Names of the columns appended after construction.
    pub fn derived_column_names(&self) -> impl Iterator<Item = &str> {
        self.column_names().skip(BASE_COLUMNS.len())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data)
    }

    /// A numeric column by name, or `None` if absent or not numeric.
    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        match self.column(name)? {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Signals(_) => None,
        }
    }

    /// A signal column by name, or `None` if absent or not a signal column.
    pub fn signals(&self, name: &str) -> Option<&[Signal]> {
        match self.column(name)? {
            ColumnData::Signals(v) => Some(v),
            ColumnData::Numeric(_) => None,
        }
    }

    /// A numeric column that `required_by` cannot run without.
    pub fn require_numeric(&self, name: &str, required_by: &str) -> Result<&[f64], ContractError> {
        match self.column(name) {
            Some(ColumnData::Numeric(v)) => Ok(v),
            Some(ColumnData::Signals(_)) => Err(ContractError::ColumnType {
                column: name.to_string(),
                expected: "numeric",
            }),
            None => Err(ContractError::MissingColumn {
                column: name.to_string(),
                required_by: required_by.to_string(),
            }),
        }
    }

    pub fn close(&self) -> &[f64] {
        self.base(3)
    }

    pub fn high(&self) -> &[f64] {
        self.base(1)
    }

    pub fn low(&self) -> &[f64] {
        self.base(2)
    }

    pub fn volume(&self) -> &[f64] {
        self.base(5)
    }

    fn base(&self, idx: usize) -> &[f64] {
        match &self.columns[idx].1 {
            ColumnData::Numeric(v) => v,
            ColumnData::Signals(_) => unreachable!("base columns are always numeric"),
        }
    }

    /// Reconstruct the candle at row `i`.
    pub fn candle(&self, i: usize) -> Option<Candle> {
        let timestamp = *self.timestamps.get(i)?;
        Some(Candle {
            timestamp,
            open: self.base(0)[i],
            high: self.base(1)[i],
            low: self.base(2)[i],
            close: self.base(3)[i],
            adj_close: self.base(4)[i],
            volume: self.base(5)[i],
        })
    }

    /// Write a numeric column, replacing any derived column of the same name.
    pub fn set_numeric(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), ContractError> {
        self.set_column(name.into(), ColumnData::Numeric(values))
    }

    /// Write a signal column, replacing any derived column of the same name.
    pub fn set_signals(&mut self, name: impl Into<String>, values: Vec<Signal>) -> Result<(), ContractError> {
        self.set_column(name.into(), ColumnData::Signals(values))
    }

    fn set_column(&mut self, name: String, data: ColumnData) -> Result<(), ContractError> {
        if BASE_COLUMNS.contains(&name.as_str()) {
            return Err(ContractError::ProtectedColumn { column: name });
        }
        if data.len() != self.len() {
            return Err(ContractError::Misaligned {
                column: name,
                expected: self.len(),
                actual: data.len(),
            });
        }

        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = data,
            None => self.columns.push((name, data)),
        }
        Ok(())
    }

    pub(crate) fn columns(&self) -> &[(String, ColumnData)] {
        &self.columns
    }
}
