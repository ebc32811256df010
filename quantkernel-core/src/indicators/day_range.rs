//! Intrabar range as a fraction of the low: (high - low) / low.

use crate::components::indicator::{Indicator, Series};
use crate::descriptor::Descriptor;
use crate::domain::{ContractError, Table};

pub const COLUMN: &str = "day_range_pct";

#[derive(Debug, Clone, Default)]
pub struct DayRangePct;

impl DayRangePct {
    pub fn new() -> Self {
        Self
    }
}

impl Indicator for DayRangePct {
    fn descriptor(&self) -> Descriptor {
        Descriptor::new(COLUMN)
    }

    fn columns(&self) -> Vec<String> {
        vec![COLUMN.to_string()]
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, table: &Table) -> Result<Vec<Series>, ContractError> {
        let high = table.require_numeric("high", COLUMN)?;
        let low = table.require_numeric("low", COLUMN)?;
        let values = high
            .iter()
            .zip(low)
            .map(|(&h, &l)| if l == 0.0 { f64::NAN } else { (h - l) / l })
            .collect();
        Ok(vec![Series::new(COLUMN, values)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_table, DEFAULT_EPSILON};

    #[test]
    fn range_over_low() {
        // close 10 on first row: high 11, low 9
        let out = DayRangePct.compute(&make_table(&[10.0])).unwrap().remove(0);
        assert_eq!(out.name, "day_range_pct");
        assert_approx(out.values[0], 2.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_low_is_nan() {
        // close 1 on first row: low = 0
        let out = DayRangePct.compute(&make_table(&[1.0])).unwrap().remove(0);
        assert!(out.values[0].is_nan());
    }

    #[test]
    fn one_value_per_row() {
        let out = DayRangePct.compute(&make_table(&[5.0, 6.0, 7.0])).unwrap();
        assert_eq!(out[0].values.len(), 3);
    }
}
