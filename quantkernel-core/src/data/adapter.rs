//! Closed set of provider adapters behind one dispatch point.

use std::sync::Arc;

use super::circuit_breaker::CircuitBreaker;
use super::dhan::{self, DhanFetcher};
use super::params::FetchParameters;
use super::provider::{fetch_table, FetchError, FetchMode, Provider};
use super::synthetic::SyntheticFetcher;
use super::upstox::{self, UpstoxFetcher};
use super::yahoo::YahooFetcher;
use crate::domain::Table;

pub enum Adapter {
    Yahoo(YahooFetcher),
    Upstox(UpstoxFetcher),
    Dhan(DhanFetcher),
    Synthetic(SyntheticFetcher),
}

impl Adapter {
    /// Build the adapter for `provider`, reading credentials from the environment.
    pub fn from_env(provider: Provider) -> Result<Self, FetchError> {
        Self::with_lookup(provider, |name| std::env::var(name).ok())
    }

    /// Build the adapter for `provider`, reading credentials through `lookup`.
    ///
    /// A missing or blank credential fails here, before any network traffic.
    pub fn with_lookup(provider: Provider, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, FetchError> {
        let credential = |variable: &'static str| {
            lookup(variable)
                .filter(|v| !v.trim().is_empty())
                .ok_or(FetchError::MissingCredential { provider, variable })
        };
        let breaker = || Arc::new(CircuitBreaker::default_provider());

        Ok(match provider {
            Provider::Yahoo => Adapter::Yahoo(YahooFetcher::new(breaker())?),
            Provider::Upstox => Adapter::Upstox(UpstoxFetcher::new(credential(upstox::TOKEN_VAR)?, breaker())?),
            Provider::Dhan => Adapter::Dhan(DhanFetcher::new(
                credential(dhan::CLIENT_ID_VAR)?,
                credential(dhan::TOKEN_VAR).or_else(|err| credential(dhan::TOKEN_ALIAS_VAR).map_err(|_| err))?,
                breaker(),
            )?),
            Provider::Synthetic => Adapter::Synthetic(SyntheticFetcher::new()),
        })
    }

    pub fn provider(&self) -> Provider {
        match self {
            Adapter::Yahoo(_) => Provider::Yahoo,
            Adapter::Upstox(_) => Provider::Upstox,
            Adapter::Dhan(_) => Provider::Dhan,
            Adapter::Synthetic(_) => Provider::Synthetic,
        }
    }

    pub fn fetch_table(&mut self, symbol: &str, mode: FetchMode, params: &FetchParameters) -> Result<Table, FetchError> {
        match self {
            Adapter::Yahoo(f) => fetch_table(f, symbol, mode, params),
            Adapter::Upstox(f) => fetch_table(f, symbol, mode, params),
            Adapter::Dhan(f) => fetch_table(f, symbol, mode, params),
            Adapter::Synthetic(f) => fetch_table(f, symbol, mode, params),
        }
    }
}

impl From<SyntheticFetcher> for Adapter {
    fn from(f: SyntheticFetcher) -> Self {
        Adapter::Synthetic(f)
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Adapter").field(&self.provider()).finish()
    }
}
