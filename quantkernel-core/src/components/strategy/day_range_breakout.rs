//! Day-range breakout: intrabar range expanding past a fixed threshold.
//!
//! BUY on the row where `day_range_pct` rises above `threshold`, SELL on the
//! row where it falls back below.

use crate::components::indicator::Indicator;
use crate::descriptor::Descriptor;
use crate::domain::{ContractError, Signal, Table};
use crate::indicators::day_range::{DayRangePct, COLUMN};

use super::{crossover_level, Strategy};

#[derive(Debug, Clone)]
pub struct DayRangeBreakout {
    pub threshold: f64,
}

impl DayRangeBreakout {
    pub fn new(threshold: f64) -> Self {
        assert!(threshold.is_finite(), "threshold must be finite");
        Self { threshold }
    }
}

impl Default for DayRangeBreakout {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl Strategy for DayRangeBreakout {
    fn descriptor(&self) -> Descriptor {
        Descriptor::new("day_range_breakout").with("threshold", self.threshold)
    }

    fn signal_prefix(&self) -> &str {
        "day_range_break"
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![Box::new(DayRangePct)]
    }

    fn compute(&self, table: &Table) -> Result<Vec<Signal>, ContractError> {
        let range = table.require_numeric(COLUMN, "day_range_breakout")?;
        Ok(crossover_level(range, self.threshold))
    }
}
