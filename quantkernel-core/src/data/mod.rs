//! Market data: provider adapters, fetch parameters, ticker universes.

pub mod adapter;
pub mod circuit_breaker;
pub mod dhan;
pub mod http;
pub mod manager;
pub mod params;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod upstox;
pub mod yahoo;

pub use adapter::Adapter;
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use manager::DataManager;
pub use params::{FetchParameters, FetchParamsUpdate, DEFAULT_EXCHANGE};
pub use provider::{fetch_table, ErrorCategory, FetchError, FetchMode, Provider, ProviderFetcher, Unit};
pub use synthetic::SyntheticFetcher;
pub use universe::{default_ticker, TickerResolver, TickerUniverse};
