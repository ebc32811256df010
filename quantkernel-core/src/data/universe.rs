//! Ticker universe: symbol lists keyed by provider, then exchange.
//!
//! Stored as TOML:
//!
//! ```toml
//! [providers.yahoo]
//! NSE = ["RELIANCE.NS", "TCS.NS"]
//!
//! [providers.dhan]
//! NSE = ["2885", "11536"]
//! ```
//!
//! Symbols are provider-native (Yahoo tickers, Upstox instrument keys, Dhan
//! security ids), so each provider carries its own lists.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::params::DEFAULT_EXCHANGE;
use super::provider::Provider;
use crate::config::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerUniverse {
    #[serde(default)]
    pub providers: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

fn owned(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

impl TickerUniverse {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Symbols for `provider` on `exchange`, empty when none are listed.
    pub fn symbols(&self, provider: Provider, exchange: &str) -> &[String] {
        self.providers
            .get(provider.as_str())
            .and_then(|by_exchange| by_exchange.get(exchange))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Exchanges listed for `provider`.
    pub fn exchanges(&self, provider: Provider) -> Vec<&str> {
        self.providers
            .get(provider.as_str())
            .map(|by_exchange| by_exchange.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn insert(&mut self, provider: Provider, exchange: &str, symbols: Vec<String>) {
        self.providers
            .entry(provider.as_str().to_string())
            .or_default()
            .insert(exchange.to_string(), symbols);
    }

    /// Built-in NSE universe for every provider.
    pub fn builtin() -> Self {
        let mut u = Self::default();
        u.insert(
            Provider::Yahoo,
            DEFAULT_EXCHANGE,
            owned(&[
                "3MINDIA.NS",
                "RELIANCE.NS",
                "TCS.NS",
                "HDFCBANK.NS",
                "INFY.NS",
                "ICICIBANK.NS",
                "HINDUNILVR.NS",
                "ITC.NS",
                "SBIN.NS",
                "BHARTIARTL.NS",
            ]),
        );
        u.insert(
            Provider::Upstox,
            DEFAULT_EXCHANGE,
            owned(&[
                "NSE_EQ|INE848E01016",
                "NSE_EQ|INE002A01018",
                "NSE_EQ|INE467B01029",
                "NSE_EQ|INE040A01034",
                "NSE_EQ|INE009A01021",
            ]),
        );
        u.insert(
            Provider::Dhan,
            DEFAULT_EXCHANGE,
            owned(&["2885", "11536", "1333", "1594", "4963"]),
        );
        u.insert(
            Provider::Synthetic,
            DEFAULT_EXCHANGE,
            owned(&["ALPHA", "BRAVO", "CHARLIE", "DELTA", "ECHO"]),
        );
        u
    }
}

/// Ticker used when the universe has nothing for a provider.
pub fn default_ticker(provider: Provider) -> &'static str {
    match provider {
        Provider::Yahoo => "3MINDIA.NS",
        Provider::Upstox => "NSE_EQ|INE848E01016",
        Provider::Dhan => "360ONE",
        Provider::Synthetic => "SYNTH",
    }
}

/// Ordered symbol list for one provider and exchange.
///
/// Index arguments follow slice semantics clamped to the list length, so
/// out-of-range requests yield fewer (or zero) symbols rather than failing.
#[derive(Debug, Clone)]
pub struct TickerResolver {
    universe: TickerUniverse,
    provider: Provider,
    exchange: String,
    tickers: Vec<String>,
}

impl TickerResolver {
    pub fn new(universe: TickerUniverse, provider: Provider, exchange: impl Into<String>) -> Self {
        let exchange = exchange.into();
        let tickers = universe.symbols(provider, &exchange).to_vec();
        Self {
            universe,
            provider,
            exchange,
            tickers,
        }
    }

    pub fn builtin(provider: Provider) -> Self {
        Self::new(TickerUniverse::builtin(), provider, DEFAULT_EXCHANGE)
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn all(&self) -> &[String] {
        &self.tickers
    }

    pub fn first(&self, n: usize) -> &[String] {
        &self.tickers[..n.min(self.tickers.len())]
    }

    pub fn slice(&self, start: usize, end: usize) -> &[String] {
        let end = end.min(self.tickers.len());
        &self.tickers[start.min(end)..end]
    }

    /// `start..end` (to the end when `end` is `None`), or the provider's
    /// default ticker when the universe lists nothing.
    pub fn resolve(&self, start: usize, end: Option<usize>) -> Vec<String> {
        if self.tickers.is_empty() {
            return vec![default_ticker(self.provider).to_string()];
        }
        self.slice(start, end.unwrap_or(self.tickers.len())).to_vec()
    }

    /// Rebind to `provider` (same exchange) and reload its symbols.
    pub fn refresh(&mut self, provider: Provider) {
        self.provider = provider;
        self.tickers = self.universe.symbols(provider, &self.exchange).to_vec();
    }

    pub fn set_exchange(&mut self, exchange: impl Into<String>) {
        self.exchange = exchange.into();
        self.refresh(self.provider);
    }
}
