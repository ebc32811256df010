//! Strategies: rule-based BUY/SELL/HOLD series over an augmented table.
//!
//! A strategy declares the indicators it reads; the strategy registry registers
//! them before the strategy runs, so `compute` can rely on their columns being
//! present. Strategies never write to the table themselves.

use crate::descriptor::Descriptor;
use crate::domain::{ContractError, Signal, Table};

use super::indicator::Indicator;

pub mod day_range_breakout;
pub mod ma_crossover;
pub mod mcginley_breakout;
pub mod vwap_crossover;

pub use day_range_breakout::DayRangeBreakout;
pub use ma_crossover::MaCrossover;
pub use mcginley_breakout::McGinleyBreakout;
pub use vwap_crossover::VwapCrossover;

/// Trait for strategies.
///
/// # Look-ahead contamination guard
/// The signal at row t may only depend on rows `0..=t`.
pub trait Strategy: Send + Sync {
    /// Identity used for deduplication: kind plus every parameter.
    fn descriptor(&self) -> Descriptor;

    /// Stem of the signal column; the registry appends `_{id}`.
    fn signal_prefix(&self) -> &str;

    /// Indicators whose columns `compute` reads.
    fn indicators(&self) -> Vec<Box<dyn Indicator>>;

    /// One signal per table row.
    fn compute(&self, table: &Table) -> Result<Vec<Signal>, ContractError>;
}

/// Crossover detection between two aligned series.
///
/// BUY where `a` crosses above `b` (`a[i] > b[i]` and `a[i-1] <= b[i-1]`),
/// SELL on the mirror condition, HOLD everywhere else. Row 0 and any row where
/// one of the four inputs is NaN stay HOLD.
pub fn crossover(a: &[f64], b: &[f64]) -> Vec<Signal> {
    let n = a.len().min(b.len());
    let mut signals = vec![Signal::Hold; a.len()];

    for i in 1..n {
        let (cur_a, cur_b, prev_a, prev_b) = (a[i], b[i], a[i - 1], b[i - 1]);
        if cur_a.is_nan() || cur_b.is_nan() || prev_a.is_nan() || prev_b.is_nan() {
            continue;
        }

        if cur_a > cur_b && prev_a <= prev_b {
            signals[i] = Signal::Buy;
        } else if cur_a < cur_b && prev_a >= prev_b {
            signals[i] = Signal::Sell;
        }
    }

    signals
}

/// Crossover of a series against a constant level.
pub fn crossover_level(a: &[f64], level: f64) -> Vec<Signal> {
    crossover(a, &vec![level; a.len()])
}
