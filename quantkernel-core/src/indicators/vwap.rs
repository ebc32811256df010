//! Volume-weighted average price over rolling calendar-day windows.
//!
//! Cumulative typical-price × volume over cumulative volume. The window is
//! anchored at the calendar date of its first row and restarts at the first
//! row whose date is `days` or more days later: `days = 1` resets every
//! calendar day, `days = 7` gives weekly windows. Rows where the cumulative
//! volume is zero are NaN. Rows with a NaN price or volume contribute nothing.

use chrono::NaiveDate;

use crate::components::indicator::{Indicator, Series};
use crate::descriptor::Descriptor;
use crate::domain::{ContractError, Table};

#[derive(Debug, Clone)]
pub struct Vwap {
    days: u32,
    column: String,
}

/// Running state at one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VwapPoint {
    pub window_start: NaiveDate,
    pub cumulative_volume: f64,
    pub vwap: f64,
}

impl Vwap {
    pub fn new(days: u32) -> Self {
        assert!(days >= 1, "VWAP window must be >= 1 day");
        Self {
            days,
            column: Self::column_name(days),
        }
    }

    pub fn column_name(days: u32) -> String {
        format!("vwap_{days}d")
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Per-row accumulation state, exposed for window inspection.
    pub fn accumulate(&self, table: &Table) -> Result<Vec<VwapPoint>, ContractError> {
        let high = table.require_numeric("high", &self.column)?;
        let low = table.require_numeric("low", &self.column)?;
        let close = table.require_numeric("close", &self.column)?;
        let volume = table.require_numeric("volume", &self.column)?;

        let mut points = Vec::with_capacity(table.len());
        let Some(first) = table.timestamps().first() else {
            return Ok(points);
        };

        let mut window_start = first.date();
        let mut cum_pv = 0.0;
        let mut cum_vol = 0.0;

        for (i, ts) in table.timestamps().iter().enumerate() {
            let date = ts.date();
            if (date - window_start).num_days() >= i64::from(self.days) {
                window_start = date;
                cum_pv = 0.0;
                cum_vol = 0.0;
            }

            let typical = (high[i] + low[i] + close[i]) / 3.0;
            if !typical.is_nan() && !volume[i].is_nan() {
                cum_pv += typical * volume[i];
                cum_vol += volume[i];
            }

            let vwap = if cum_vol == 0.0 { f64::NAN } else { cum_pv / cum_vol };
            points.push(VwapPoint {
                window_start,
                cumulative_volume: cum_vol,
                vwap,
            });
        }

        Ok(points)
    }
}

impl Indicator for Vwap {
    fn descriptor(&self) -> Descriptor {
        Descriptor::new("vwap").with("days", self.days)
    }

    fn columns(&self) -> Vec<String> {
        vec![self.column.clone()]
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, table: &Table) -> Result<Vec<Series>, ContractError> {
        let values = self.accumulate(table)?.into_iter().map(|p| p.vwap).collect();
        Ok(vec![Series::new(self.column.clone(), values)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Candle;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDateTime;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    /// Bars with high = low = close = price, so typical price == price.
    fn table(rows: &[(NaiveDateTime, f64, f64)]) -> Table {
        let candles = rows
            .iter()
            .map(|&(ts, price, vol)| Candle::unadjusted(ts, price, price, price, price, vol));
        Table::from_candles("TEST", candles)
    }

    #[test]
    fn weighted_within_one_day() {
        let t = table(&[(at(2, 10), 10.0, 100.0), (at(2, 11), 20.0, 300.0)]);
        let out = Vwap::new(1).compute(&t).unwrap().remove(0).values;
        assert_approx(out[0], 10.0, DEFAULT_EPSILON);
        assert_approx(out[1], (10.0 * 100.0 + 20.0 * 300.0) / 400.0, DEFAULT_EPSILON);
    }

    #[test]
    fn daily_window_resets_each_calendar_day() {
        let t = table(&[
            (at(2, 10), 10.0, 100.0),
            (at(2, 11), 20.0, 100.0),
            (at(3, 10), 40.0, 100.0),
        ]);
        let points = Vwap::new(1).accumulate(&t).unwrap();
        assert_eq!(points[1].cumulative_volume, 200.0);
        assert_eq!(points[2].cumulative_volume, 100.0);
        assert_eq!(points[2].window_start, at(3, 0).date());
        assert_approx(points[2].vwap, 40.0, DEFAULT_EPSILON);
    }

    #[test]
    fn multi_day_window_is_anchored_at_first_date() {
        let rows: Vec<_> = (2..=10).map(|d| (at(d, 0), d as f64, 10.0)).collect();
        let points = Vwap::new(7).accumulate(&table(&rows)).unwrap();
        // Jan 2..=8 share a window; Jan 9 is 7 days after the anchor.
        assert_eq!(points[6].cumulative_volume, 70.0);
        assert_eq!(points[7].cumulative_volume, 10.0);
        assert_eq!(points[8].cumulative_volume, 20.0);
    }

    #[test]
    fn zero_volume_is_nan() {
        let t = table(&[(at(2, 10), 10.0, 0.0), (at(2, 11), 12.0, 50.0)]);
        let out = Vwap::new(1).compute(&t).unwrap().remove(0).values;
        assert!(out[0].is_nan());
        assert_approx(out[1], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn empty_table() {
        let out = Vwap::new(1).compute(&Table::empty("X")).unwrap();
        assert!(out[0].values.is_empty());
    }

    #[test]
    fn column_and_descriptor() {
        assert_eq!(Vwap::new(7).column(), "vwap_7d");
        assert_ne!(Vwap::new(1).descriptor(), Vwap::new(7).descriptor());
    }
}
