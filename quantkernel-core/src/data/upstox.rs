//! Upstox v3 provider (historical and intraday).
//!
//! Symbols are instrument keys such as `NSE_EQ|INE848E01016`. Candles come
//! back newest first as `[timestamp, open, high, low, close, volume, oi]`
//! arrays with RFC 3339 timestamps carrying the exchange offset; they are
//! returned oldest first with the offset dropped.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

use super::circuit_breaker::CircuitBreaker;
use super::http::{parse_json, HttpClient};
use super::provider::{unsupported, FetchError, FetchMode, Provider, ProviderFetcher, Unit};
use crate::domain::Candle;

const BASE_URL: &str = "https://api.upstox.com/v3/historical-candle";
pub const TOKEN_VAR: &str = "UPSTOX_ACCESS_TOKEN";

#[derive(Debug, Deserialize)]
struct CandleResponse {
    status: String,
    #[serde(default)]
    data: Option<CandleData>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct CandleData {
    #[serde(default)]
    candles: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

pub struct UpstoxFetcher {
    access_token: String,
    http: HttpClient,
}

impl UpstoxFetcher {
    pub fn new(access_token: String, breaker: Arc<CircuitBreaker>) -> Result<Self, FetchError> {
        Ok(Self {
            access_token,
            http: HttpClient::new(breaker)?,
        })
    }

    fn unit_path(unit: Unit) -> &'static str {
        unit.as_str()
    }

    /// Instrument keys contain `|`, which must be escaped in a path segment.
    fn encode_key(symbol: &str) -> String {
        symbol.replace('|', "%7C")
    }

    fn historical_url(symbol: &str, start: NaiveDate, end: NaiveDate, unit: Unit, interval: u32) -> String {
        format!(
            "{BASE_URL}/{}/{}/{interval}/{end}/{start}",
            Self::encode_key(symbol),
            Self::unit_path(unit)
        )
    }

    fn intraday_url(symbol: &str, unit: Unit, interval: u32) -> String {
        format!(
            "{BASE_URL}/intraday/{}/{}/{interval}",
            Self::encode_key(symbol),
            Self::unit_path(unit)
        )
    }

    fn get(&self, label: &str, url: &str) -> Result<Vec<Candle>, FetchError> {
        let body = self.http.send(label, |c| {
            c.get(url)
                .header("Accept", "application/json")
                .bearer_auth(&self.access_token)
        })?;
        parse_candles(&body)
    }
}

/// Parse a candle response body into candles, oldest first.
pub(crate) fn parse_candles(body: &str) -> Result<Vec<Candle>, FetchError> {
    let resp: CandleResponse = parse_json("upstox", body)?;

    if resp.status != "success" {
        let first = resp.errors.into_iter().next();
        return Err(FetchError::ProviderError {
            code: first.as_ref().map(|e| e.error_code.clone()).unwrap_or_default(),
            message: first.map(|e| e.message).unwrap_or(resp.status),
        });
    }

    let rows = resp.data.map(|d| d.candles).unwrap_or_default();
    let mut candles = rows
        .iter()
        .map(|row| parse_row(row))
        .collect::<Result<Vec<_>, _>>()?;
    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

fn parse_row(row: &[Value]) -> Result<Candle, FetchError> {
    let bad = |what: &str| FetchError::ResponseFormatChanged(format!("upstox candle {what}: {row:?}"));

    let ts = row.first().and_then(Value::as_str).ok_or_else(|| bad("timestamp"))?;
    let timestamp = DateTime::parse_from_rfc3339(ts)
        .map_err(|_| bad("timestamp"))?
        .naive_local();

    let num = |i: usize| row.get(i).and_then(Value::as_f64).ok_or_else(|| bad("field"));
    Ok(Candle::unadjusted(timestamp, num(1)?, num(2)?, num(3)?, num(4)?, num(5)?))
}

impl ProviderFetcher for UpstoxFetcher {
    const PROVIDER: Provider = Provider::Upstox;
    const SUPPORTS_INTRADAY: bool = true;
    const SUPPORTS_HISTORICAL: bool = true;

    fn connect(&mut self) -> Result<(), FetchError> {
        if self.access_token.trim().is_empty() {
            return Err(FetchError::MissingCredential {
                provider: Provider::Upstox,
                variable: TOKEN_VAR,
            });
        }
        Ok(())
    }

    fn check_granularity(&self, mode: FetchMode, unit: Unit, interval: u32) -> Result<(), FetchError> {
        let ok = match (mode, unit) {
            (_, Unit::Minutes) => (1..=300).contains(&interval),
            (_, Unit::Hours) => (1..=5).contains(&interval),
            (_, Unit::Days) => interval == 1,
            (FetchMode::Historical, Unit::Weeks | Unit::Months) => interval == 1,
            (FetchMode::Intraday, Unit::Weeks | Unit::Months) | (_, Unit::Years) => false,
        };
        if ok {
            return Ok(());
        }
        let allowed = match mode {
            FetchMode::Historical => "minutes 1-300, hours 1-5, days/weeks/months 1",
            FetchMode::Intraday => "minutes 1-300, hours 1-5, days 1",
        };
        Err(unsupported::<Self>(mode, unit, interval, allowed))
    }

    fn fetch_historical(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        unit: Unit,
        interval: u32,
        _exchange: &str,
    ) -> Result<Vec<Candle>, FetchError> {
        let url = Self::historical_url(symbol, start, end, unit, interval);
        self.get(&format!("upstox {symbol}"), &url)
    }

    fn fetch_intraday(
        &self,
        symbol: &str,
        unit: Unit,
        interval: u32,
        _exchange: &str,
    ) -> Result<Vec<Candle>, FetchError> {
        let url = Self::intraday_url(symbol, unit, interval);
        self.get(&format!("upstox {symbol}"), &url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(token: &str) -> UpstoxFetcher {
        UpstoxFetcher::new(token.into(), Arc::new(CircuitBreaker::default_provider())).unwrap()
    }

    #[test]
    fn parses_and_orders_oldest_first() {
        let body = r#"{"status":"success","data":{"candles":[
            ["2025-01-03T00:00:00+05:30", 53.1, 53.95, 51.6, 52.05, 235519861, 0],
            ["2025-01-02T00:00:00+05:30", 52.0, 53.5, 51.8, 53.1, 180000000, 0]
        ]}}"#;
        let candles = parse_candles(body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp.to_string(), "2025-01-02 00:00:00");
        assert_eq!(candles[1].close, 52.05);
        assert_eq!(candles[1].adj_close, 52.05);
        assert_eq!(candles[1].volume, 235519861.0);
    }

    #[test]
    fn empty_candle_list_is_empty() {
        let body = r#"{"status":"success","data":{"candles":[]}}"#;
        assert!(parse_candles(body).unwrap().is_empty());
    }

    #[test]
    fn error_envelope_is_provider_error() {
        let body = r#"{"status":"error","errors":[{"errorCode":"UDAPI1015","message":"to_date cannot be less than from_date"}]}"#;
        let err = parse_candles(body).unwrap_err();
        assert!(matches!(err, FetchError::ProviderError { code, .. } if code == "UDAPI1015"));
    }

    #[test]
    fn malformed_row_is_format_change() {
        let body = r#"{"status":"success","data":{"candles":[["2025-01-02T00:00:00+05:30", "x"]]}}"#;
        assert!(matches!(
            parse_candles(body).unwrap_err(),
            FetchError::ResponseFormatChanged(_)
        ));
    }

    #[test]
    fn urls_escape_instrument_key() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
        assert_eq!(
            UpstoxFetcher::historical_url("NSE_EQ|INE848E01016", d(1), d(31), Unit::Days, 1),
            "https://api.upstox.com/v3/historical-candle/NSE_EQ%7CINE848E01016/days/1/2025-01-31/2025-01-01"
        );
        assert_eq!(
            UpstoxFetcher::intraday_url("NSE_EQ|INE848E01016", Unit::Minutes, 5),
            "https://api.upstox.com/v3/historical-candle/intraday/NSE_EQ%7CINE848E01016/minutes/5"
        );
    }

    #[test]
    fn granularity_limits() {
        let f = fetcher("t");
        let (h, i) = (FetchMode::Historical, FetchMode::Intraday);
        assert!(f.check_granularity(h, Unit::Minutes, 300).is_ok());
        assert!(f.check_granularity(h, Unit::Minutes, 301).is_err());
        assert!(f.check_granularity(h, Unit::Hours, 5).is_ok());
        assert!(f.check_granularity(h, Unit::Hours, 6).is_err());
        assert!(f.check_granularity(h, Unit::Weeks, 1).is_ok());
        assert!(f.check_granularity(h, Unit::Months, 2).is_err());
        assert!(f.check_granularity(h, Unit::Years, 1).is_err());
        assert!(f.check_granularity(i, Unit::Days, 1).is_ok());
        assert!(f.check_granularity(i, Unit::Weeks, 1).is_err());
    }

    #[test]
    fn blank_token_fails_connect() {
        let mut f = fetcher("  ");
        assert!(matches!(
            f.connect(),
            Err(FetchError::MissingCredential { variable: TOKEN_VAR, .. })
        ));
        assert!(fetcher("abc").connect().is_ok());
    }
}
