//! Fetch parameters and their partial-update form.

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::provider::{Provider, Unit};

pub const DEFAULT_EXCHANGE: &str = "NSE";
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Current fetch configuration held by the data manager.
///
/// No semantic validation happens here; `fetch_table` checks presence and
/// ranges at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchParameters {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub unit: Unit,
    /// Historical candle interval, in `unit`s.
    pub interval: u32,
    /// Intraday candle interval, in `unit`s.
    pub intraday_interval: u32,
    pub exchange: String,
}

impl FetchParameters {
    /// Defaults relative to `today`: the last 30 days up to yesterday, daily candles.
    pub fn relative_to(today: NaiveDate) -> Self {
        Self {
            from: Some(today - Duration::days(DEFAULT_LOOKBACK_DAYS)),
            to: Some(today - Duration::days(1)),
            unit: Unit::Days,
            interval: 1,
            intraday_interval: 1,
            exchange: DEFAULT_EXCHANGE.to_string(),
        }
    }

    /// Overwrite every field supplied in `update`; omitted fields keep their value.
    pub fn apply(&mut self, update: &FetchParamsUpdate) {
        if let Some(from) = update.from {
            self.from = Some(from);
        }
        if let Some(to) = update.to {
            self.to = Some(to);
        }
        if let Some(unit) = update.unit {
            self.unit = unit;
        }
        if let Some(interval) = update.interval {
            self.interval = interval;
        }
        if let Some(intraday_interval) = update.intraday_interval {
            self.intraday_interval = intraday_interval;
        }
        if let Some(exchange) = &update.exchange {
            self.exchange.clone_from(exchange);
        }
    }
}

impl Default for FetchParameters {
    fn default() -> Self {
        Self::relative_to(Local::now().date_naive())
    }
}

/// Partial update: `None` means "keep the current value".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchParamsUpdate {
    pub provider: Option<Provider>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub unit: Option<Unit>,
    pub interval: Option<u32>,
    pub intraday_interval: Option<u32>,
    pub exchange: Option<String>,
}

impl FetchParamsUpdate {
    /// Layer `other` on top of `self`: fields set in `other` win.
    pub fn merged_with(&self, other: &FetchParamsUpdate) -> FetchParamsUpdate {
        FetchParamsUpdate {
            provider: other.provider.or(self.provider),
            from: other.from.or(self.from),
            to: other.to.or(self.to),
            unit: other.unit.or(self.unit),
            interval: other.interval.or(self.interval),
            intraday_interval: other.intraday_interval.or(self.intraday_interval),
            exchange: other.exchange.clone().or_else(|| self.exchange.clone()),
        }
    }
}
