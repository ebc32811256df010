//! Concrete indicator implementations.
//!
//! All four indicators implement the `Indicator` trait from
//! `components::indicator`. Each writes one or more named columns whose names
//! are derived from its parameters, so two differently configured instances
//! never collide in a table.

pub mod day_range;
pub mod mcginley;
pub mod moving_average;
pub mod vwap;

pub use day_range::DayRangePct;
pub use mcginley::McGinley;
pub use moving_average::MovingAverage;
pub use vwap::Vwap;

/// Build a daily table from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for the first row),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_table(closes: &[f64]) -> crate::domain::Table {
    use crate::domain::{Candle, Table};
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let candles = closes.iter().enumerate().map(|(i, &close)| {
        let open = if i == 0 { close } else { closes[i - 1] };
        Candle::unadjusted(
            base + chrono::Duration::days(i as i64),
            open,
            open.max(close) + 1.0,
            open.min(close) - 1.0,
            close,
            1000.0,
        )
    });
    Table::from_candles("TEST", candles)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
