//! Dhan v2 provider.
//!
//! Historical: daily candles only. Intraday: minute candles in
//! {1, 5, 15, 25, 60} over the trailing 90 days. Symbols are Dhan security
//! ids. Responses are column arrays with epoch-second timestamps, converted
//! to exchange-local (IST) wall-clock time.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::circuit_breaker::CircuitBreaker;
use super::http::{parse_json, HttpClient};
use super::provider::{unsupported, FetchError, FetchMode, Provider, ProviderFetcher, Unit};
use crate::domain::Candle;

const BASE_URL: &str = "https://api.dhan.co/v2/charts";
pub const CLIENT_ID_VAR: &str = "DHAN_CLIENT_ID";
pub const TOKEN_VAR: &str = "DHAN_SECRET_KEY";
/// Accepted when `TOKEN_VAR` is unset.
pub const TOKEN_ALIAS_VAR: &str = "DHAN_ACCESS_TOKEN";

/// Intraday lookback accepted by Dhan in a single request.
pub const INTRADAY_WINDOW_DAYS: i64 = 90;
const INTRADAY_INTERVALS: [u32; 5] = [1, 5, 15, 25, 60];
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ChartRequest {
    security_id: String,
    exchange_segment: String,
    instrument: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<String>,
    oi: bool,
    from_date: String,
    to_date: String,
}

#[derive(Debug, Deserialize)]
struct ChartColumns {
    #[serde(default)]
    open: Vec<f64>,
    #[serde(default)]
    high: Vec<f64>,
    #[serde(default)]
    low: Vec<f64>,
    #[serde(default)]
    close: Vec<f64>,
    #[serde(default)]
    volume: Vec<f64>,
    #[serde(default)]
    timestamp: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    error_code: String,
    #[serde(default)]
    error_message: String,
}

pub struct DhanFetcher {
    client_id: String,
    access_token: String,
    http: HttpClient,
}

impl DhanFetcher {
    pub fn new(client_id: String, access_token: String, breaker: Arc<CircuitBreaker>) -> Result<Self, FetchError> {
        Ok(Self {
            client_id,
            access_token,
            http: HttpClient::new(breaker)?,
        })
    }

    /// `NSE` → `NSE_EQ`; explicit segments pass through.
    fn segment(exchange: &str) -> String {
        if exchange.contains('_') {
            exchange.to_string()
        } else {
            format!("{}_EQ", exchange.to_ascii_uppercase())
        }
    }

    fn historical_request(symbol: &str, start: NaiveDate, end: NaiveDate, exchange: &str) -> ChartRequest {
        ChartRequest {
            security_id: symbol.to_string(),
            exchange_segment: Self::segment(exchange),
            instrument: "EQUITY",
            interval: None,
            oi: false,
            from_date: start.to_string(),
            // toDate is exclusive
            to_date: (end + Duration::days(1)).to_string(),
        }
    }

    fn intraday_request(symbol: &str, interval: u32, exchange: &str, now: NaiveDateTime) -> ChartRequest {
        let fmt = "%Y-%m-%d %H:%M:%S";
        ChartRequest {
            security_id: symbol.to_string(),
            exchange_segment: Self::segment(exchange),
            instrument: "EQUITY",
            interval: Some(interval.to_string()),
            oi: false,
            from_date: (now - Duration::days(INTRADAY_WINDOW_DAYS)).format(fmt).to_string(),
            to_date: now.format(fmt).to_string(),
        }
    }

    fn post(&self, symbol: &str, path: &str, request: &ChartRequest) -> Result<Vec<Candle>, FetchError> {
        let url = format!("{BASE_URL}/{path}");
        let body = self
            .http
            .send(&format!("dhan {symbol}"), |c| {
                c.post(&url)
                    .header("access-token", &self.access_token)
                    .header("client-id", &self.client_id)
                    .json(request)
            })
            .map_err(refine_error)?;
        parse_columns(&body)
    }
}

/// Replace an HTTP-status provider error with Dhan's own code when the body
/// is an error envelope.
fn refine_error(err: FetchError) -> FetchError {
    match err {
        FetchError::ProviderError { code, message } => match serde_json::from_str::<ErrorEnvelope>(&message) {
            Ok(env) => FetchError::ProviderError {
                code: env.error_code,
                message: env.error_message,
            },
            Err(_) => FetchError::ProviderError { code, message },
        },
        other => other,
    }
}

fn ist(epoch: f64) -> Option<NaiveDateTime> {
    let offset = FixedOffset::east_opt(IST_OFFSET_SECS)?;
    DateTime::from_timestamp(epoch as i64, 0).map(|dt| dt.with_timezone(&offset).naive_local())
}

/// Parse a column-array body into candles.
pub(crate) fn parse_columns(body: &str) -> Result<Vec<Candle>, FetchError> {
    if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(body) {
        return Err(FetchError::ProviderError {
            code: env.error_code,
            message: env.error_message,
        });
    }

    let cols: ChartColumns = parse_json("dhan", body)?;
    let n = cols.timestamp.len();
    for (name, len) in [
        ("open", cols.open.len()),
        ("high", cols.high.len()),
        ("low", cols.low.len()),
        ("close", cols.close.len()),
        ("volume", cols.volume.len()),
    ] {
        if len != n {
            return Err(FetchError::ResponseFormatChanged(format!(
                "dhan: column '{name}' has {len} values, timestamp has {n}"
            )));
        }
    }

    (0..n)
        .map(|i| {
            let timestamp = ist(cols.timestamp[i]).ok_or_else(|| {
                FetchError::ResponseFormatChanged(format!("dhan: invalid timestamp {}", cols.timestamp[i]))
            })?;
            Ok(Candle::unadjusted(
                timestamp,
                cols.open[i],
                cols.high[i],
                cols.low[i],
                cols.close[i],
                cols.volume[i],
            ))
        })
        .collect()
}

impl ProviderFetcher for DhanFetcher {
    const PROVIDER: Provider = Provider::Dhan;
    const SUPPORTS_INTRADAY: bool = true;
    const SUPPORTS_HISTORICAL: bool = true;

    fn connect(&mut self) -> Result<(), FetchError> {
        if self.client_id.trim().is_empty() {
            return Err(FetchError::MissingCredential {
                provider: Provider::Dhan,
                variable: CLIENT_ID_VAR,
            });
        }
        if self.access_token.trim().is_empty() {
            return Err(FetchError::MissingCredential {
                provider: Provider::Dhan,
                variable: TOKEN_VAR,
            });
        }
        Ok(())
    }

    fn check_granularity(&self, mode: FetchMode, unit: Unit, interval: u32) -> Result<(), FetchError> {
        match mode {
            FetchMode::Historical if unit == Unit::Days && interval == 1 => Ok(()),
            FetchMode::Historical => Err(unsupported::<Self>(mode, unit, interval, "historical: days with interval 1 only")),
            FetchMode::Intraday if unit == Unit::Minutes && INTRADAY_INTERVALS.contains(&interval) => Ok(()),
            FetchMode::Intraday => Err(unsupported::<Self>(mode, unit, interval, "intraday: minutes in {1,5,15,25,60}")),
        }
    }

    fn fetch_historical(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        _unit: Unit,
        _interval: u32,
        exchange: &str,
    ) -> Result<Vec<Candle>, FetchError> {
        let request = Self::historical_request(symbol, start, end, exchange);
        self.post(symbol, "historical", &request)
    }

    fn fetch_intraday(
        &self,
        symbol: &str,
        _unit: Unit,
        interval: u32,
        exchange: &str,
    ) -> Result<Vec<Candle>, FetchError> {
        let request = Self::intraday_request(symbol, interval, exchange, Local::now().naive_local());
        self.post(symbol, "intraday", &request)
    }
}
