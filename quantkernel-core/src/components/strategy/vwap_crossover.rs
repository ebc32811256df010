//! VWAP crossover: short-window VWAP against long-window VWAP.

use crate::components::indicator::Indicator;
use crate::descriptor::Descriptor;
use crate::domain::{ContractError, Signal, Table};
use crate::indicators::Vwap;

use super::{crossover, Strategy};

#[derive(Debug, Clone)]
pub struct VwapCrossover {
    pub fast_days: u32,
    pub slow_days: u32,
    fast: Vwap,
    slow: Vwap,
}

impl VwapCrossover {
    pub fn new(fast_days: u32, slow_days: u32) -> Self {
        assert!(fast_days >= 1, "fast_days must be >= 1");
        assert!(slow_days > fast_days, "slow_days must be > fast_days");
        Self {
            fast_days,
            slow_days,
            fast: Vwap::new(fast_days),
            slow: Vwap::new(slow_days),
        }
    }
}

impl Default for VwapCrossover {
    fn default() -> Self {
        Self::new(1, 7)
    }
}

impl Strategy for VwapCrossover {
    fn descriptor(&self) -> Descriptor {
        Descriptor::new("vwap_crossover")
            .with("fast_days", self.fast_days)
            .with("slow_days", self.slow_days)
    }

    fn signal_prefix(&self) -> &str {
        "vwap_cross"
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![Box::new(self.fast.clone()), Box::new(self.slow.clone())]
    }

    fn compute(&self, table: &Table) -> Result<Vec<Signal>, ContractError> {
        let fast = table.require_numeric(self.fast.column(), "vwap_crossover")?;
        let slow = table.require_numeric(self.slow.column(), "vwap_crossover")?;
        Ok(crossover(fast, slow))
    }
}
