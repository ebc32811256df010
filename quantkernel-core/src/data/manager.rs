//! Data manager: current provider, fetch parameters, adapter and resolver.

use std::sync::Arc;

use tracing::info;

use super::adapter::Adapter;
use super::params::{FetchParameters, FetchParamsUpdate};
use super::provider::{FetchError, FetchMode, Provider};
use super::universe::{TickerResolver, TickerUniverse};
use crate::domain::Table;

type CredentialLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Owns the active adapter and the ticker resolver bound to the same provider.
///
/// The two are only ever replaced together, after the new adapter has been
/// built, so a failed switch leaves the previous provider fully usable.
pub struct DataManager {
    params: FetchParameters,
    adapter: Adapter,
    resolver: TickerResolver,
    lookup: CredentialLookup,
}

impl DataManager {
    /// Manager for `provider` with credentials from the environment and the
    /// built-in universe.
    pub fn new(provider: Provider) -> Result<Self, FetchError> {
        Self::with_lookup(provider, TickerUniverse::builtin(), |name: &str| std::env::var(name).ok())
    }

    pub fn with_lookup(
        provider: Provider,
        universe: TickerUniverse,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Result<Self, FetchError> {
        let lookup: CredentialLookup = Arc::new(lookup);
        let adapter = Adapter::with_lookup(provider, |name| lookup(name))?;
        Ok(Self::assemble(adapter, universe, lookup))
    }

    /// Manager around a pre-built adapter. Later switches read the environment.
    pub fn with_adapter(adapter: Adapter, universe: TickerUniverse) -> Self {
        Self::assemble(adapter, universe, Arc::new(|name: &str| std::env::var(name).ok()))
    }

    fn assemble(adapter: Adapter, universe: TickerUniverse, lookup: CredentialLookup) -> Self {
        let params = FetchParameters::default();
        let resolver = TickerResolver::new(universe, adapter.provider(), params.exchange.clone());
        Self {
            params,
            adapter,
            resolver,
            lookup,
        }
    }

    pub fn provider(&self) -> Provider {
        self.adapter.provider()
    }

    pub fn parameters(&self) -> &FetchParameters {
        &self.params
    }

    pub fn resolver(&self) -> &TickerResolver {
        &self.resolver
    }

    /// Overwrite the supplied fields. A supplied provider is switched to
    /// first; if that fails nothing is changed.
    ///
    /// No semantic validation happens here; bad dates or intervals surface
    /// at fetch time.
    pub fn set_parameters(&mut self, update: &FetchParamsUpdate) -> Result<(), FetchError> {
        if let Some(provider) = update.provider {
            self.switch_provider(provider)?;
        }
        self.params.apply(update);
        if update.exchange.is_some() && self.resolver.exchange() != self.params.exchange {
            self.resolver.set_exchange(self.params.exchange.clone());
        }
        Ok(())
    }

    /// Switch to `provider`. No-op when it is already active.
    pub fn switch_provider(&mut self, provider: Provider) -> Result<(), FetchError> {
        if provider == self.provider() {
            return Ok(());
        }
        let lookup = Arc::clone(&self.lookup);
        let adapter = Adapter::with_lookup(provider, |name| lookup(name))?;

        let previous = self.provider();
        self.adapter = adapter;
        self.resolver.refresh(provider);
        info!(from = %previous, to = %provider, "switched provider");
        Ok(())
    }

    pub fn fetch(&mut self, ticker: &str, mode: FetchMode) -> Result<Table, FetchError> {
        self.adapter.fetch_table(ticker, mode, &self.params)
    }

    pub fn fetch_historical(&mut self, ticker: &str) -> Result<Table, FetchError> {
        self.fetch(ticker, FetchMode::Historical)
    }

    pub fn fetch_intraday(&mut self, ticker: &str) -> Result<Table, FetchError> {
        self.fetch(ticker, FetchMode::Intraday)
    }
}

impl std::fmt::Debug for DataManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataManager")
            .field("provider", &self.provider())
            .field("params", &self.params)
            .field("exchange", &self.resolver.exchange())
            .finish()
    }
}
