//! Strategy registry: deduplicated strategies over a private indicator registry.
//!
//! Adding a strategy registers its indicator dependencies transitively and
//! assigns it a registry-local id from a monotonic counter. Its signals are
//! written to `{signal_prefix}_{id}`, so two differently configured strategies
//! of the same kind never share a column. Re-adding an equal strategy is a
//! no-op that returns the existing column.

use std::collections::HashMap;

use tracing::debug;

use super::indicator_registry::IndicatorRegistry;
use crate::components::strategy::Strategy;
use crate::descriptor::Descriptor;
use crate::domain::{ContractError, Table};

struct Registered {
    column: String,
    strategy: Box<dyn Strategy>,
}

pub struct StrategyRegistry {
    indicators: IndicatorRegistry,
    columns: HashMap<Descriptor, String>,
    strategies: Vec<Registered>,
    next_id: u64,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self {
            indicators: IndicatorRegistry::new(),
            columns: HashMap::new(),
            strategies: Vec::new(),
            next_id: 1,
        }
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy and its indicators; returns its signal column.
    pub fn add(&mut self, strategy: Box<dyn Strategy>) -> String {
        let descriptor = strategy.descriptor();
        if let Some(column) = self.columns.get(&descriptor) {
            return column.clone();
        }

        for indicator in strategy.indicators() {
            self.indicators.add(indicator);
        }

        let column = format!("{}_{}", strategy.signal_prefix(), self.next_id);
        self.next_id += 1;
        self.columns.insert(descriptor, column.clone());
        self.strategies.push(Registered {
            column: column.clone(),
            strategy,
        });
        column
    }

    /// The shared indicator registry, also used for standalone indicators.
    pub fn indicators(&self) -> &IndicatorRegistry {
        &self.indicators
    }

    pub fn indicators_mut(&mut self) -> &mut IndicatorRegistry {
        &mut self.indicators
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Signal column names in execution order.
    pub fn signal_columns(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|r| r.column.as_str())
    }

    /// Run all indicators, then every strategy in registration order.
    pub fn run(&self, table: &mut Table) -> Result<(), ContractError> {
        self.indicators.run(table)?;

        for entry in &self.strategies {
            let signals = entry.strategy.compute(table)?;
            debug!(
                strategy = %entry.strategy.descriptor(),
                column = %entry.column,
                fired = signals.iter().filter(|s| !s.is_hold()).count(),
                "strategy computed"
            );
            table.set_signals(entry.column.clone(), signals)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("indicators", &self.indicators)
            .field("signal_columns", &self.signal_columns().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::indicator::Indicator;
    use crate::components::strategy::{DayRangeBreakout, MaCrossover, McGinleyBreakout};
    use crate::domain::Signal;
    use crate::indicators::{make_table, MovingAverage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        calls: Arc<AtomicUsize>,
        signals_short_by: usize,
    }

    impl Strategy for Counting {
        fn descriptor(&self) -> Descriptor {
            Descriptor::new("counting").with("short_by", self.signals_short_by)
        }
        fn signal_prefix(&self) -> &str {
            "counting"
        }
        fn indicators(&self) -> Vec<Box<dyn Indicator>> {
            vec![Box::new(MovingAverage::new(2))]
        }
        fn compute(&self, table: &Table) -> Result<Vec<Signal>, ContractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Signal::Hold; table.len() - self.signals_short_by])
        }
    }

    fn counting(short_by: usize) -> (Box<Counting>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Counting {
                calls: Arc::clone(&calls),
                signals_short_by: short_by,
            }),
            calls,
        )
    }

    #[test]
    fn identical_strategies_share_one_column() {
        let mut reg = StrategyRegistry::new();
        let (a, calls_a) = counting(0);
        let (b, calls_b) = counting(0);
        let col_a = reg.add(a);
        let col_b = reg.add(b);
        assert_eq!(col_a, "counting_1");
        assert_eq!(col_a, col_b);
        assert_eq!(reg.len(), 1);

        let mut table = make_table(&[1.0, 2.0, 3.0]);
        reg.run(&mut table).unwrap();
        assert_eq!(calls_a.load(Ordering::SeqCst), 1);
        assert_eq!(calls_b.load(Ordering::SeqCst), 0);
        assert_eq!(
            table.derived_column_names().collect::<Vec<_>>(),
            vec!["ma_2", "counting_1"]
        );
    }

    #[test]
    fn distinct_strategies_get_distinct_ids() {
        let mut reg = StrategyRegistry::new();
        assert_eq!(reg.add(Box::new(MaCrossover::new(7, 21))), "ma_cross_1");
        assert_eq!(reg.add(Box::new(MaCrossover::new(5, 10))), "ma_cross_2");
        assert_eq!(reg.add(Box::new(DayRangeBreakout::default())), "day_range_break_3");
        assert_eq!(reg.add(Box::new(MaCrossover::new(7, 21))), "ma_cross_1");
        assert_eq!(
            reg.signal_columns().collect::<Vec<_>>(),
            vec!["ma_cross_1", "ma_cross_2", "day_range_break_3"]
        );
    }

    #[test]
    fn shared_indicators_are_registered_once() {
        let mut reg = StrategyRegistry::new();
        reg.add(Box::new(MaCrossover::new(7, 21)));
        reg.add(Box::new(MaCrossover::new(7, 30)));
        // ma_7, ma_21, ma_30
        assert_eq!(reg.indicators().len(), 3);
    }

    #[test]
    fn indicators_run_before_strategies() {
        let mut reg = StrategyRegistry::new();
        reg.add(Box::new(McGinleyBreakout::default()));
        let mut table = make_table(&[100.0, 101.0, 99.0, 102.0]);
        reg.run(&mut table).unwrap();
        assert!(table.has_column("mcginley_14"));
        assert_eq!(table.signals("mcg_break_1").unwrap().len(), 4);
    }

    #[test]
    fn misaligned_signals_are_contract_error() {
        let mut reg = StrategyRegistry::new();
        reg.add(counting(1).0);
        let mut table = make_table(&[1.0, 2.0, 3.0]);
        let err = reg.run(&mut table).unwrap_err();
        assert!(matches!(err, ContractError::Misaligned { column, .. } if column == "counting_1"));
    }

    #[test]
    fn base_columns_are_never_modified() {
        let mut reg = StrategyRegistry::new();
        reg.add(Box::new(MaCrossover::new(2, 3)));
        let mut table = make_table(&[5.0, 6.0, 7.0, 3.0]);
        let before: Vec<f64> = table.close().to_vec();
        reg.run(&mut table).unwrap();
        assert_eq!(table.close(), before.as_slice());
    }
}
