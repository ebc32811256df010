//! McGinley Dynamic.
//!
//! Self-adjusting moving average:
//!   md[0] = price[0]
//!   md[i] = md[i-1] + (price[i] - md[i-1]) / (k * period * (price[i] / md[i-1])^4)
//!
//! When the previous value is zero or NaN, or the step is not finite, the
//! value falls back to the current price. The series therefore never carries
//! infinities and never panics on degenerate input such as `[100, 0]`.

use crate::components::indicator::{Indicator, PriceSource, Series};
use crate::descriptor::Descriptor;
use crate::domain::{ContractError, Table};

pub const DEFAULT_PERIOD: usize = 14;
pub const DEFAULT_K: f64 = 0.6;

#[derive(Debug, Clone)]
pub struct McGinley {
    period: usize,
    k: f64,
    source: PriceSource,
    column: String,
}

impl McGinley {
    pub fn new(period: usize, k: f64, source: PriceSource) -> Self {
        assert!(period >= 1, "McGinley period must be >= 1");
        assert!(k > 0.0 && k.is_finite(), "McGinley k must be positive");
        Self {
            period,
            k,
            source,
            column: Self::column_name(period, k, source),
        }
    }

    /// `mcginley_{period}`; a non-default `k` appends `_k{k}` and a non-close
    /// source appends `_{source}`.
    pub fn column_name(period: usize, k: f64, source: PriceSource) -> String {
        let mut name = format!("mcginley_{period}");
        if k != DEFAULT_K {
            name.push_str(&format!("_k{k}"));
        }
        if source != PriceSource::Close {
            name.push('_');
            name.push_str(source.as_str());
        }
        name
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn source(&self) -> PriceSource {
        self.source
    }

    fn dynamic(&self, prices: &[f64]) -> Vec<f64> {
        let mut md = Vec::with_capacity(prices.len());
        let Some(&first) = prices.first() else {
            return md;
        };
        md.push(first);

        let scale = self.k * self.period as f64;
        for &price in &prices[1..] {
            let prev = md[md.len() - 1];
            let next = if prev == 0.0 || prev.is_nan() {
                price
            } else {
                let step = (price - prev) / (scale * (price / prev).powi(4));
                if step.is_finite() {
                    prev + step
                } else {
                    price
                }
            };
            md.push(next);
        }
        md
    }
}

impl Default for McGinley {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_K, PriceSource::Close)
    }
}

impl Indicator for McGinley {
    fn descriptor(&self) -> Descriptor {
        Descriptor::new("mcginley")
            .with("period", self.period)
            .with("k", self.k)
            .with("source", self.source.as_str())
    }

    fn columns(&self) -> Vec<String> {
        vec![self.column.clone()]
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, table: &Table) -> Result<Vec<Series>, ContractError> {
        let prices = self.source.read(table, &self.column)?;
        Ok(vec![Series::new(self.column.clone(), self.dynamic(prices))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_table, DEFAULT_EPSILON};

    fn run(md: &McGinley, closes: &[f64]) -> Vec<f64> {
        md.compute(&make_table(closes)).unwrap().remove(0).values
    }

    #[test]
    fn first_value_is_price() {
        let out = run(&McGinley::default(), &[50.0, 51.0, 52.0]);
        assert_eq!(out[0], 50.0);
    }

    #[test]
    fn recurrence_matches_formula() {
        let out = run(&McGinley::default(), &[100.0, 110.0]);
        let expected = 100.0 + 10.0 / (0.6 * 14.0 * (110.0f64 / 100.0).powi(4));
        assert_approx(out[1], expected, DEFAULT_EPSILON);
    }

    #[test]
    fn constant_price_is_fixed_point() {
        let out = run(&McGinley::default(), &[42.0; 20]);
        for v in out {
            assert_approx(v, 42.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn zero_price_falls_back_without_panicking() {
        let out = run(&McGinley::default(), &[100.0, 0.0]);
        assert_eq!(out[0], 100.0);
        assert_eq!(out[1], 0.0);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn zero_previous_value_takes_current_price() {
        let out = run(&McGinley::default(), &[0.0, 5.0, 6.0]);
        assert_eq!(out[1], 5.0);
        assert!(out[2].is_finite());
    }

    #[test]
    fn nan_previous_value_takes_current_price() {
        let out = run(&McGinley::default(), &[f64::NAN, 7.0]);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 7.0);
    }

    #[test]
    fn empty_table_yields_empty_series() {
        let out = McGinley::default().compute(&Table::empty("X")).unwrap();
        assert!(out[0].values.is_empty());
    }

    #[test]
    fn column_names_reflect_parameters() {
        assert_eq!(McGinley::default().column(), "mcginley_14");
        assert_eq!(
            McGinley::new(10, 0.8, PriceSource::Close).column(),
            "mcginley_10_k0.8"
        );
        assert_eq!(
            McGinley::new(14, DEFAULT_K, PriceSource::High).column(),
            "mcginley_14_high"
        );
    }
}
