//! Simple moving average over a configurable price source.
//!
//! Trailing arithmetic mean over `period` rows.
//! Lookback: period - 1 (first valid value at index period-1). Any NaN in the
//! window yields NaN for that row.

use crate::components::indicator::{Indicator, PriceSource, Series};
use crate::descriptor::Descriptor;
use crate::domain::{ContractError, Table};

#[derive(Debug, Clone)]
pub struct MovingAverage {
    period: usize,
    source: PriceSource,
    column: String,
}

impl MovingAverage {
    pub fn new(period: usize) -> Self {
        Self::with_source(period, PriceSource::Close)
    }

    pub fn with_source(period: usize, source: PriceSource) -> Self {
        assert!(period >= 1, "moving average period must be >= 1");
        Self {
            period,
            source,
            column: Self::column_name(period, source),
        }
    }

    /// `ma_{period}`, with `_{source}` appended for non-close sources.
    pub fn column_name(period: usize, source: PriceSource) -> String {
        match source {
            PriceSource::Close => format!("ma_{period}"),
            other => format!("ma_{period}_{other}"),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

/// Rolling mean. Each output depends only on its own `period` inputs.
pub(crate) fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    for (i, window) in values.windows(period).enumerate() {
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i + period - 1] = window.iter().sum::<f64>() / period as f64;
    }

    result
}

impl Indicator for MovingAverage {
    fn descriptor(&self) -> Descriptor {
        Descriptor::new("ma")
            .with("period", self.period)
            .with("source", self.source.as_str())
    }

    fn columns(&self) -> Vec<String> {
        vec![self.column.clone()]
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, table: &Table) -> Result<Vec<Series>, ContractError> {
        let prices = self.source.read(table, &self.column)?;
        Ok(vec![Series::new(
            self.column.clone(),
            rolling_mean(prices, self.period),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_table, DEFAULT_EPSILON};

    fn values(ma: &MovingAverage, closes: &[f64]) -> Vec<f64> {
        ma.compute(&make_table(closes)).unwrap().remove(0).values
    }

    #[test]
    fn ma_5_basic() {
        let result = values(&MovingAverage::new(5), &[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);

        assert_eq!(result.len(), 7);
        for (i, v) in result.iter().enumerate().take(4) {
            assert!(v.is_nan(), "expected NaN at index {i}");
        }
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
        assert_approx(result[5], 13.0, DEFAULT_EPSILON);
        assert_approx(result[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ma_1_is_source() {
        let result = values(&MovingAverage::new(1), &[100.0, 200.0, 300.0]);
        assert_eq!(result, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn ma_nan_propagation() {
        let result = values(&MovingAverage::new(3), &[10.0, 11.0, f64::NAN, 13.0, 14.0, 15.0]);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
        assert_approx(result[5], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ma_large_values_do_not_leak_into_later_windows() {
        let result = rolling_mean(&[1e17, 1.0, 1.0, 1.0], 2);
        assert!(result[0].is_nan());
        assert_eq!(result[2], 1.0);
        assert_eq!(result[3], 1.0);
    }

    #[test]
    fn ma_recovers_after_infinite_input() {
        let result = rolling_mean(&[f64::INFINITY, 1.0, 2.0, 3.0, 4.0], 2);
        assert!(result[0].is_nan());
        assert_eq!(result[1], f64::INFINITY);
        assert_eq!(&result[2..], &[1.5, 2.5, 3.5]);
    }

    #[test]
    fn ma_too_few_rows() {
        let result = values(&MovingAverage::new(5), &[10.0, 11.0]);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ma_on_empty_table() {
        let out = MovingAverage::new(3).compute(&Table::empty("X")).unwrap();
        assert_eq!(out[0].values.len(), 0);
    }

    #[test]
    fn ma_reads_configured_source() {
        // make_table sets high = max(open, close) + 1
        let ma = MovingAverage::with_source(1, PriceSource::High);
        let out = ma.compute(&make_table(&[10.0, 12.0])).unwrap();
        assert_eq!(out[0].name, "ma_1_high");
        assert_eq!(out[0].values, vec![11.0, 13.0]);
    }

    #[test]
    fn ma_column_and_descriptor() {
        let ma = MovingAverage::new(21);
        assert_eq!(ma.column(), "ma_21");
        assert_eq!(ma.lookback(), 20);
        assert_eq!(ma.descriptor(), MovingAverage::new(21).descriptor());
        assert_ne!(
            ma.descriptor(),
            MovingAverage::with_source(21, PriceSource::Open).descriptor()
        );
    }

    #[test]
    #[should_panic(expected = "period must be >= 1")]
    fn ma_zero_period_panics() {
        MovingAverage::new(0);
    }
}
