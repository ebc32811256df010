//! Moving average crossover: golden cross and death cross detection.
//!
//! BUY when the fast MA crosses above the slow MA, SELL when it crosses below.

use crate::components::indicator::Indicator;
use crate::descriptor::Descriptor;
use crate::domain::{ContractError, Signal, Table};
use crate::indicators::MovingAverage;

use super::{crossover, Strategy};

/// Moving average crossover strategy.
///
/// # Indicator dependencies
/// Two close-price moving averages: `ma_{fast}` and `ma_{slow}`.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    pub fast: usize,
    pub slow: usize,
    fast_ma: MovingAverage,
    slow_ma: MovingAverage,
}

impl MaCrossover {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(fast >= 1, "fast must be >= 1");
        assert!(slow > fast, "slow must be > fast");
        Self {
            fast,
            slow,
            fast_ma: MovingAverage::new(fast),
            slow_ma: MovingAverage::new(slow),
        }
    }
}

impl Default for MaCrossover {
    fn default() -> Self {
        Self::new(7, 21)
    }
}

impl Strategy for MaCrossover {
    fn descriptor(&self) -> Descriptor {
        Descriptor::new("ma_crossover")
            .with("fast", self.fast)
            .with("slow", self.slow)
    }

    fn signal_prefix(&self) -> &str {
        "ma_cross"
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![Box::new(self.fast_ma.clone()), Box::new(self.slow_ma.clone())]
    }

    fn compute(&self, table: &Table) -> Result<Vec<Signal>, ContractError> {
        let fast = table.require_numeric(self.fast_ma.column(), "ma_crossover")?;
        let slow = table.require_numeric(self.slow_ma.column(), "ma_crossover")?;
        Ok(crossover(fast, slow))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_table;

    fn prepared(closes: &[f64], strategy: &MaCrossover) -> Table {
        let mut table = make_table(closes);
        for ind in strategy.indicators() {
            for series in ind.compute(&table).unwrap() {
                table.set_numeric(series.name, series.values).unwrap();
            }
        }
        table
    }

    #[test]
    fn golden_cross_after_flat_run() {
        let s = MaCrossover::new(2, 4);
        let closes = [10.0, 10.0, 10.0, 10.0, 10.0, 12.0, 14.0];
        let signals = s.compute(&prepared(&closes, &s)).unwrap();
        assert_eq!(signals[5], Signal::Buy);
        assert_eq!(signals.iter().filter(|s| !s.is_hold()).count(), 1);
    }

    #[test]
    fn death_cross_after_decline() {
        let s = MaCrossover::new(2, 4);
        let closes = [10.0, 10.0, 10.0, 10.0, 10.0, 8.0, 6.0];
        let signals = s.compute(&prepared(&closes, &s)).unwrap();
        assert_eq!(signals[5], Signal::Sell);
    }

    #[test]
    fn warmup_rows_hold() {
        let s = MaCrossover::new(2, 4);
        let closes = [10.0, 1.0, 30.0, 2.0];
        let signals = s.compute(&prepared(&closes, &s)).unwrap();
        assert!(signals.iter().all(Signal::is_hold));
    }

    #[test]
    fn missing_indicator_column_is_contract_error() {
        let s = MaCrossover::default();
        let err = s.compute(&make_table(&[1.0, 2.0])).unwrap_err();
        assert!(matches!(err, ContractError::MissingColumn { column, .. } if column == "ma_7"));
    }

    #[test]
    fn declares_both_averages() {
        let cols: Vec<String> = MaCrossover::default()
            .indicators()
            .iter()
            .flat_map(|i| i.columns())
            .collect();
        assert_eq!(cols, vec!["ma_7", "ma_21"]);
    }

    #[test]
    #[should_panic(expected = "slow must be > fast")]
    fn inverted_periods_panic() {
        MaCrossover::new(21, 7);
    }
}
