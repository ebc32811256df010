//! Computation engine: the two deduplicating registries.
//!
//! The indicator registry derives numeric columns in first-seen order; the
//! strategy registry owns one, runs it, then writes one signal column per
//! distinct strategy.

pub mod indicator_registry;
pub mod strategy_registry;

pub use indicator_registry::IndicatorRegistry;
pub use strategy_registry::StrategyRegistry;
