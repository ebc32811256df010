//! Pipeline orchestration: fetch, indicators, strategies for one ticker or a batch.
//!
//! Every ticker gets a fresh `StrategyRegistry`, so strategy ids and signal
//! column names are reproducible per table and nothing leaks between tickers.

pub mod batch;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::components::{FactoryError, IndicatorFactory, StrategyFactory};
use crate::data::{DataManager, FetchMode, FetchParamsUpdate};
use crate::descriptor::ComponentConfig;
use crate::domain::Table;
use crate::engine::StrategyRegistry;
use crate::error::Result;

pub use batch::{run_batch, BatchEvent, BatchSummary, BatchWorker};

/// What to compute: fetch mode and parameter overrides plus component configs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineRequest {
    pub mode: FetchMode,
    /// Partial update applied to the data manager; a provider here triggers a switch.
    pub params: FetchParamsUpdate,
    /// Standalone indicators, computed alongside strategy dependencies.
    pub indicators: Vec<ComponentConfig>,
    pub strategies: Vec<ComponentConfig>,
}

/// Component factories used to turn configs into a registry.
pub struct Pipeline {
    indicators: IndicatorFactory,
    strategies: StrategyFactory,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Pipeline with the built-in indicator and strategy kinds.
    pub fn new() -> Self {
        Self::with_factories(IndicatorFactory::with_builtins(), StrategyFactory::with_builtins())
    }

    pub fn with_factories(indicators: IndicatorFactory, strategies: StrategyFactory) -> Self {
        Self { indicators, strategies }
    }

    pub fn indicator_factory(&self) -> &IndicatorFactory {
        &self.indicators
    }

    pub fn strategy_factory(&self) -> &StrategyFactory {
        &self.strategies
    }

    /// Build a fresh registry from the request's component configs.
    pub fn build_registry(&self, request: &PipelineRequest) -> Result<StrategyRegistry, FactoryError> {
        let mut registry = StrategyRegistry::new();
        for indicator in self.indicators.create_all(&request.indicators)? {
            registry.indicators_mut().add(indicator);
        }
        for strategy in self.strategies.create_all(&request.strategies)? {
            registry.add(strategy);
        }
        Ok(registry)
    }

    /// Apply the request's parameters, then fetch and compute one ticker.
    pub fn run_single(&self, manager: &mut DataManager, request: &PipelineRequest, ticker: &str) -> Result<Table> {
        manager.set_parameters(&request.params)?;
        self.run_ticker(manager, request, ticker)
    }

    /// Fetch and compute one ticker with the manager's current parameters.
    pub fn run_ticker(&self, manager: &mut DataManager, request: &PipelineRequest, ticker: &str) -> Result<Table> {
        let mut table = manager.fetch(ticker, request.mode)?;
        debug!(ticker, rows = table.len(), "fetched");

        let registry = self.build_registry(request)?;
        registry.run(&mut table)?;
        debug!(
            ticker,
            indicators = registry.indicators().len(),
            strategies = registry.len(),
            "computed"
        );
        Ok(table)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("indicators", &self.indicators.kinds().map(|(k, _)| k).collect::<Vec<_>>())
            .field("strategies", &self.strategies.kinds().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}
