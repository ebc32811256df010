//! Crate-level error aggregating the per-layer errors.

use thiserror::Error;

use crate::components::FactoryError;
use crate::config::ConfigError;
use crate::data::{ErrorCategory, FetchError};
use crate::domain::{ContractError, ExportError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("failed to start batch worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl Error {
    /// Fetch category, or `Configuration` for bad component or config input.
    /// `None` for contract and export failures.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Error::Fetch(e) => Some(e.category()),
            Error::Factory(_) | Error::Config(_) => Some(ErrorCategory::Configuration),
            Error::Contract(_) | Error::Export(_) | Error::Spawn(_) => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
