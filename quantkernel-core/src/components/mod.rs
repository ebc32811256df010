//! Component traits and their factories.
//!
//! - Indicator: derives named numeric columns from a table
//! - Strategy: derives one BUY/SELL/HOLD series from an augmented table and
//!   declares the indicators it reads
//! - Factories: build either from a `ComponentConfig`

pub mod factory;
pub mod indicator;
pub mod strategy;

pub use factory::{FactoryError, IndicatorFactory, ParamKind, ParamSpec, StrategyFactory};
pub use indicator::{Indicator, PriceSource, Series};
pub use strategy::{crossover, Strategy};
