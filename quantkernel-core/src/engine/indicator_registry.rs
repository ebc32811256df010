//! Indicator registry: deduplicated, ordered indicator execution.
//!
//! Indicators are keyed by their `Descriptor`; registering an equal descriptor
//! twice is a no-op, so a column shared by several strategies is computed once.
//! Execution follows first-registration order.

use std::collections::HashSet;

use tracing::debug;

use crate::components::indicator::Indicator;
use crate::descriptor::Descriptor;
use crate::domain::{ContractError, Table};

#[derive(Default)]
pub struct IndicatorRegistry {
    seen: HashSet<Descriptor>,
    indicators: Vec<Box<dyn Indicator>>,
}

impl IndicatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an indicator. Returns `false` if an equal one is already present.
    pub fn add(&mut self, indicator: Box<dyn Indicator>) -> bool {
        if !self.seen.insert(indicator.descriptor()) {
            return false;
        }
        self.indicators.push(indicator);
        true
    }

    pub fn contains(&self, descriptor: &Descriptor) -> bool {
        self.seen.contains(descriptor)
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Descriptors in execution order.
    pub fn descriptors(&self) -> Vec<Descriptor> {
        self.indicators.iter().map(|i| i.descriptor()).collect()
    }

    /// Maximum lookback across all registered indicators.
    pub fn warmup(&self) -> usize {
        self.indicators.iter().map(|i| i.lookback()).max().unwrap_or(0)
    }

    /// Compute every indicator in order and write its columns into `table`.
    ///
    /// Each indicator sees the columns written by those before it. A series
    /// whose length differs from the table's row count aborts the run.
    pub fn run(&self, table: &mut Table) -> Result<(), ContractError> {
        for indicator in &self.indicators {
            let series = indicator.compute(table)?;
            if let Some(bad) = series.iter().find(|s| s.values.len() != table.len()) {
                return Err(ContractError::Misaligned {
                    column: bad.name.clone(),
                    expected: table.len(),
                    actual: bad.values.len(),
                });
            }

            debug!(
                indicator = %indicator.descriptor(),
                columns = series.len(),
                rows = table.len(),
                "indicator computed"
            );
            for s in series {
                table.set_numeric(s.name, s.values)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for IndicatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorRegistry")
            .field("indicators", &self.descriptors())
            .finish()
    }
}
