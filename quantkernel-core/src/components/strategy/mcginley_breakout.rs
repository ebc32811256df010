//! McGinley breakout: price crossing its McGinley Dynamic.

use crate::components::indicator::{Indicator, PriceSource};
use crate::descriptor::Descriptor;
use crate::domain::{ContractError, Signal, Table};
use crate::indicators::mcginley::{McGinley, DEFAULT_K, DEFAULT_PERIOD};

use super::{crossover, Strategy};

#[derive(Debug, Clone)]
pub struct McGinleyBreakout {
    dynamic: McGinley,
    period: usize,
    k: f64,
}

impl McGinleyBreakout {
    pub fn new(period: usize, k: f64, source: PriceSource) -> Self {
        Self {
            dynamic: McGinley::new(period, k, source),
            period,
            k,
        }
    }
}

impl Default for McGinleyBreakout {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_K, PriceSource::Close)
    }
}

impl Strategy for McGinleyBreakout {
    fn descriptor(&self) -> Descriptor {
        Descriptor::new("mcginley_breakout")
            .with("period", self.period)
            .with("k", self.k)
            .with("source", self.dynamic.source().as_str())
    }

    fn signal_prefix(&self) -> &str {
        "mcg_break"
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![Box::new(self.dynamic.clone())]
    }

    fn compute(&self, table: &Table) -> Result<Vec<Signal>, ContractError> {
        let price = self.dynamic.source().read(table, "mcginley_breakout")?;
        let md = table.require_numeric(self.dynamic.column(), "mcginley_breakout")?;
        Ok(crossover(price, md))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_table;

    #[test]
    fn price_jump_above_dynamic_buys() {
        let s = McGinleyBreakout::default();
        let mut table = make_table(&[100.0, 100.0, 100.0, 110.0, 90.0]);
        for ind in s.indicators() {
            for series in ind.compute(&table).unwrap() {
                table.set_numeric(series.name, series.values).unwrap();
            }
        }

        let signals = s.compute(&table).unwrap();
        // Row 3: price 110 > md (lags below), row 2 price == md.
        assert_eq!(signals[3], Signal::Buy);
        assert_eq!(signals[4], Signal::Sell);
        assert!(signals[..3].iter().all(Signal::is_hold));
    }

    #[test]
    fn requires_dynamic_column() {
        let err = McGinleyBreakout::default()
            .compute(&make_table(&[1.0]))
            .unwrap_err();
        assert!(matches!(err, ContractError::MissingColumn { .. }));
    }
}
