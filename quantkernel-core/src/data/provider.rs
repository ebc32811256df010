//! Provider capability trait, fetch vocabulary and structured error types.
//!
//! Every market data source implements `ProviderFetcher`. Capability flags are
//! associated constants, so the capability check in `fetch_table` happens
//! before any connection state or network traffic is touched.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::params::FetchParameters;
use crate::domain::{Candle, Table};

/// Market data providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(alias = "yfinance")]
    Yahoo,
    Upstox,
    Dhan,
    Synthetic,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Yahoo,
        Provider::Upstox,
        Provider::Dhan,
        Provider::Synthetic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Yahoo => "yahoo",
            Provider::Upstox => "upstox",
            Provider::Dhan => "dhan",
            Provider::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yahoo" | "yfinance" => Ok(Provider::Yahoo),
            "upstox" => Ok(Provider::Upstox),
            "dhan" => Ok(Provider::Dhan),
            "synthetic" => Ok(Provider::Synthetic),
            other => Err(format!(
                "unknown provider '{other}' (expected yahoo, upstox, dhan or synthetic)"
            )),
        }
    }
}

/// Candle granularity unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Minutes => "minutes",
            Unit::Hours => "hours",
            Unit::Days => "days",
            Unit::Weeks => "weeks",
            Unit::Months => "months",
            Unit::Years => "years",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minutes" | "minute" | "m" => Ok(Unit::Minutes),
            "hours" | "hour" | "h" => Ok(Unit::Hours),
            "days" | "day" | "d" => Ok(Unit::Days),
            "weeks" | "week" | "w" => Ok(Unit::Weeks),
            "months" | "month" | "mo" => Ok(Unit::Months),
            "years" | "year" | "y" => Ok(Unit::Years),
            other => Err(format!("unknown unit '{other}'")),
        }
    }
}

/// Historical range fetch or the provider's current-session fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Historical,
    Intraday,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchMode::Historical => "historical",
            FetchMode::Intraday => "intraday",
        })
    }
}

impl FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "historical" => Ok(FetchMode::Historical),
            "intraday" => Ok(FetchMode::Intraday),
            other => Err(format!("unknown fetch mode '{other}' (expected historical or intraday)")),
        }
    }
}

/// Coarse classification of a `FetchError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing credential or bad fetch parameter; fix the configuration.
    Configuration,
    /// The provider cannot serve this mode or granularity.
    Capability,
    /// Network, payload or provider-side failure.
    Provider,
}

/// Structured error types for fetch operations.
///
/// These are designed to be displayable in both CLI and log contexts.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{provider}: missing credential, set environment variable {variable}")]
    MissingCredential {
        provider: Provider,
        variable: &'static str,
    },

    #[error("missing fetch parameter '{0}' (required for historical mode)")]
    MissingParameter(&'static str),

    #[error("invalid fetch parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    #[error("{0}: intraday data is not supported by this provider")]
    IntradayUnsupported(Provider),

    #[error("{0}: historical data is not supported by this provider")]
    HistoricalUnsupported(Provider),

    #[error("{provider}: {mode} {unit} with interval {interval} is not supported ({allowed})")]
    UnsupportedGranularity {
        provider: Provider,
        mode: FetchMode,
        unit: Unit,
        interval: u32,
        allowed: String,
    },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("provider error {code}: {message}")]
    ProviderError { code: String, message: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("hard stop: provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,
}

impl FetchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FetchError::MissingCredential { .. }
            | FetchError::MissingParameter(_)
            | FetchError::InvalidParameter { .. }
            | FetchError::ClientSetup(_) => ErrorCategory::Configuration,
            FetchError::IntradayUnsupported(_)
            | FetchError::HistoricalUnsupported(_)
            | FetchError::UnsupportedGranularity { .. } => ErrorCategory::Capability,
            FetchError::NetworkUnreachable(_)
            | FetchError::RateLimited { .. }
            | FetchError::AuthenticationRequired(_)
            | FetchError::ProviderError { .. }
            | FetchError::ResponseFormatChanged(_)
            | FetchError::CircuitBreakerTripped => ErrorCategory::Provider,
        }
    }
}

/// Trait for market data providers.
///
/// Implementations only translate between the provider's wire format and
/// `Candle`s. Capability flags, parameter presence and range checks live in
/// `fetch_table`, which every caller goes through.
pub trait ProviderFetcher: Send {
    const PROVIDER: Provider;
    const SUPPORTS_INTRADAY: bool;
    const SUPPORTS_HISTORICAL: bool;

    /// Establish or validate the connection. Must be idempotent.
    fn connect(&mut self) -> Result<(), FetchError> {
        Ok(())
    }

    /// Reject unit/interval combinations the provider cannot serve.
    fn check_granularity(&self, _mode: FetchMode, _unit: Unit, _interval: u32) -> Result<(), FetchError> {
        Ok(())
    }

    fn fetch_historical(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        unit: Unit,
        interval: u32,
        exchange: &str,
    ) -> Result<Vec<Candle>, FetchError>;

    fn fetch_intraday(
        &self,
        symbol: &str,
        unit: Unit,
        interval: u32,
        exchange: &str,
    ) -> Result<Vec<Candle>, FetchError>;
}

/// Build an `UnsupportedGranularity` error for provider `P`.
pub(crate) fn unsupported<P: ProviderFetcher>(
    mode: FetchMode,
    unit: Unit,
    interval: u32,
    allowed: impl Into<String>,
) -> FetchError {
    FetchError::UnsupportedGranularity {
        provider: P::PROVIDER,
        mode,
        unit,
        interval,
        allowed: allowed.into(),
    }
}

/// Fetch `symbol` in `mode` and materialize the result as a table.
///
/// Order of checks: connect, capability, parameters (historical needs both
/// dates, `from <= to`, intervals >= 1), provider granularity, then the fetch
/// itself. An empty provider response yields an empty table.
pub fn fetch_table<F: ProviderFetcher>(
    fetcher: &mut F,
    symbol: &str,
    mode: FetchMode,
    params: &FetchParameters,
) -> Result<Table, FetchError> {
    fetcher.connect()?;

    let candles = match mode {
        FetchMode::Intraday => {
            if !F::SUPPORTS_INTRADAY {
                return Err(FetchError::IntradayUnsupported(F::PROVIDER));
            }
            let interval = positive("intraday_interval", params.intraday_interval)?;
            fetcher.check_granularity(mode, params.unit, interval)?;
            fetcher.fetch_intraday(symbol, params.unit, interval, &params.exchange)?
        }
        FetchMode::Historical => {
            if !F::SUPPORTS_HISTORICAL {
                return Err(FetchError::HistoricalUnsupported(F::PROVIDER));
            }
            let start = params.from.ok_or(FetchError::MissingParameter("from"))?;
            let end = params.to.ok_or(FetchError::MissingParameter("to"))?;
            if start > end {
                return Err(FetchError::InvalidParameter {
                    name: "from",
                    reason: format!("{start} is after to={end}"),
                });
            }
            let interval = positive("interval", params.interval)?;
            fetcher.check_granularity(mode, params.unit, interval)?;
            fetcher.fetch_historical(symbol, start, end, params.unit, interval, &params.exchange)?
        }
    };

    debug!(
        provider = %F::PROVIDER,
        symbol,
        %mode,
        rows = candles.len(),
        "fetched candles"
    );
    Ok(Table::from_candles(symbol, candles))
}

fn positive(name: &'static str, value: u32) -> Result<u32, FetchError> {
    if value == 0 {
        return Err(FetchError::InvalidParameter {
            name,
            reason: "must be >= 1".into(),
        });
    }
    Ok(value)
}
