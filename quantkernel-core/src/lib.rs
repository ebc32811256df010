//! QuantKernel Core: market data adapters, indicator and strategy registries, pipeline.
//!
//! This crate turns provider candles into augmented tables:
//! - Domain types (candles, signals, columnar tables, export)
//! - Provider adapters behind one capability trait (Yahoo, Upstox, Dhan, synthetic)
//! - Data manager with ticker universes and partial parameter updates
//! - Descriptor-deduplicated indicator and strategy registries
//! - String-tagged component factories with parameter schemas
//! - Single-ticker and batch pipelines

pub mod components;
pub mod config;
pub mod data;
pub mod descriptor;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod pipeline;

pub use error::{Error, Result};
