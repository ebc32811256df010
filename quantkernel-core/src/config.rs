//! TOML pipeline configuration.
//!
//! ```toml
//! provider = "synthetic"
//! mode = "historical"
//!
//! [fetch]
//! from = "2024-01-01"
//! to = "2024-06-30"
//! unit = "days"
//!
//! [tickers]
//! end = 3
//!
//! [[strategies]]
//! type = "ma_crossover"
//! params = { fast = 7, slow = 21 }
//! ```
//!
//! Dates are quoted strings. Credentials never live here; they are read from
//! the environment when an adapter is built.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{FetchMode, FetchParamsUpdate, Provider, TickerResolver};
use crate::descriptor::ComponentConfig;
use crate::pipeline::PipelineRequest;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Which tickers a batch runs over.
///
/// An explicit `symbols` list wins; otherwise `start..end` of the provider's
/// universe list is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TickerSelection {
    pub symbols: Vec<String>,
    pub start: usize,
    pub end: Option<usize>,
}

impl TickerSelection {
    pub fn resolve(&self, resolver: &TickerResolver) -> Vec<String> {
        if self.symbols.is_empty() {
            resolver.resolve(self.start, self.end)
        } else {
            self.symbols.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub provider: Option<Provider>,
    pub mode: FetchMode,
    /// Universe file; the built-in universe when absent.
    pub universe: Option<PathBuf>,
    pub fetch: FetchParamsUpdate,
    pub tickers: TickerSelection,
    pub indicators: Vec<ComponentConfig>,
    pub strategies: Vec<ComponentConfig>,
}

impl PipelineConfig {
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

    /// Provider to use: top-level `provider`, else `fetch.provider`.
    pub fn effective_provider(&self) -> Option<Provider> {
        self.provider.or(self.fetch.provider)
    }

    pub fn to_request(&self) -> PipelineRequest {
        let mut params = self.fetch.clone();
        params.provider = self.effective_provider();
        PipelineRequest {
            mode: self.mode,
            params,
            indicators: self.indicators.clone(),
            strategies: self.strategies.clone(),
        }
    }
}
