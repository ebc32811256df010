//! Yahoo Finance provider (historical only).
//!
//! Uses the v8 chart API. Timestamps come back as UTC epoch seconds and are
//! shifted by the exchange's `gmtoffset` so candles carry exchange-local time.
//!
//! Yahoo has no official API and is subject to unannounced format changes;
//! every shape problem surfaces as `ResponseFormatChanged`.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate};
use serde::Deserialize;

use super::circuit_breaker::CircuitBreaker;
use super::http::{parse_json, HttpClient};
use super::provider::{unsupported, FetchError, FetchMode, Provider, ProviderFetcher, Unit};
use crate::domain::Candle;

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooFetcher {
    http: HttpClient,
}

impl YahooFetcher {
    pub fn new(breaker: Arc<CircuitBreaker>) -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpClient::new(breaker)?,
        })
    }

    /// Yahoo interval code, e.g. `5m`, `1h`, `1d`, `1wk`, `3mo`.
    fn interval_code(unit: Unit, interval: u32) -> String {
        let suffix = match unit {
            Unit::Minutes => "m",
            Unit::Hours => "h",
            Unit::Days => "d",
            Unit::Weeks => "wk",
            Unit::Months | Unit::Years => "mo",
        };
        format!("{interval}{suffix}")
    }

    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate, unit: Unit, interval: u32) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive; extend to the end of `end`.
        let end_ts = (end + Duration::days(1))
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{BASE_URL}/{symbol}?period1={start_ts}&period2={end_ts}&interval={}\
             &includeAdjustedClose=true",
            Self::interval_code(unit, interval)
        )
    }
}

/// Parse a chart API body into candles.
///
/// Rows where every OHLCV field is null (holidays) are skipped; partially null
/// rows keep NaN prices and zero volume. A missing adjusted close mirrors close.
pub(crate) fn parse_chart(symbol: &str, body: &str) -> Result<Vec<Candle>, FetchError> {
    let resp: ChartResponse = parse_json("yahoo", body)?;

    let result = match (resp.chart.result, resp.chart.error) {
        (_, Some(err)) => {
            return Err(FetchError::ProviderError {
                code: err.code,
                message: format!("{symbol}: {}", err.description),
            })
        }
        (Some(result), None) => result,
        (None, None) => {
            return Err(FetchError::ResponseFormatChanged(
                "empty result with no error".into(),
            ))
        }
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(Vec::new());
    };
    let Some(timestamps) = data.timestamp else {
        // Valid symbol, no trading in the requested range.
        return Ok(Vec::new());
    };

    let offset = data.meta.map(|m| m.gmtoffset).unwrap_or(0);
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::ResponseFormatChanged("no quote data".into()))?;
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let field = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();

    let mut candles = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let timestamp = DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| FetchError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let open = field(&quote.open, i);
        let high = field(&quote.high, i);
        let low = field(&quote.low, i);
        let close = field(&quote.close, i);
        let volume = field(&quote.volume, i);

        if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none() {
            continue;
        }

        let close = close.unwrap_or(f64::NAN);
        let adj_close = adj_closes
            .as_deref()
            .and_then(|v| field(v, i))
            .unwrap_or(close);

        candles.push(Candle {
            timestamp,
            open: open.unwrap_or(f64::NAN),
            high: high.unwrap_or(f64::NAN),
            low: low.unwrap_or(f64::NAN),
            close,
            adj_close,
            volume: volume.unwrap_or(0.0),
        });
    }

    Ok(candles)
}

impl ProviderFetcher for YahooFetcher {
    const PROVIDER: Provider = Provider::Yahoo;
    const SUPPORTS_INTRADAY: bool = false;
    const SUPPORTS_HISTORICAL: bool = true;

    fn check_granularity(&self, mode: FetchMode, unit: Unit, interval: u32) -> Result<(), FetchError> {
        let (allowed, description): (&[u32], &str) = match unit {
            Unit::Minutes => (&[1, 2, 5, 15, 30, 60, 90], "minutes in {1,2,5,15,30,60,90}"),
            Unit::Hours => (&[1], "hours = 1"),
            Unit::Days => (&[1, 5], "days in {1,5}"),
            Unit::Weeks => (&[1], "weeks = 1"),
            Unit::Months => (&[1, 3], "months in {1,3}"),
            Unit::Years => (&[], "years are not supported"),
        };
        if allowed.contains(&interval) {
            Ok(())
        } else {
            Err(unsupported::<Self>(mode, unit, interval, description))
        }
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
        let url = Self::chart_url(symbol, start, end, unit, interval);
        let body = self.http.send(&format!("yahoo {symbol}"), |c| c.get(&url))?;
        parse_chart(symbol, &body)
    }

    fn fetch_intraday(
        &self,
        _symbol: &str,
        _unit: Unit,
        _interval: u32,
        _exchange: &str,
    ) -> Result<Vec<Candle>, FetchError> {
        Err(FetchError::IntradayUnsupported(Provider::Yahoo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"gmtoffset": 19800},
                "timestamp": [1704167100, 1704253500, 1704339900],
                "indicators": {
                    "quote": [{
                        "open":   [100.0, null, 102.0],
                        "high":   [105.0, null, 106.0],
                        "low":    [99.0,  null, 101.0],
                        "close":  [104.0, null, null],
                        "volume": [1000,  null, 3000]
                    }],
                    "adjclose": [{"adjclose": [103.5, null, null]}]
                }
            }],
            "error": null
        }
    }"#;

    fn fetcher() -> YahooFetcher {
        YahooFetcher::new(Arc::new(CircuitBreaker::default_provider())).unwrap()
    }

    #[test]
    fn parses_rows_and_skips_holidays() {
        let candles = parse_chart("INFY.NS", BODY).unwrap();
        assert_eq!(candles.len(), 2);

        let first = &candles[0];
        assert_eq!(first.open, 100.0);
        assert_eq!(first.adj_close, 103.5);
        assert_eq!(first.volume, 1000.0);
        // 2024-01-02 03:45 UTC → 09:15 IST
        assert_eq!(first.timestamp.to_string(), "2024-01-02 09:15:00");

        let last = &candles[1];
        assert!(last.close.is_nan());
        assert!(last.adj_close.is_nan());
    }

    #[test]
    fn error_payload_is_provider_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("NOPE", body).unwrap_err();
        assert!(matches!(err, FetchError::ProviderError { code, .. } if code == "Not Found"));
    }

    #[test]
    fn missing_timestamps_is_empty() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse_chart("X", body).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_format_change() {
        assert!(matches!(
            parse_chart("X", "<html>").unwrap_err(),
            FetchError::ResponseFormatChanged(_)
        ));
    }

    #[test]
    fn granularity_table() {
        let f = fetcher();
        let h = FetchMode::Historical;
        assert!(f.check_granularity(h, Unit::Minutes, 15).is_ok());
        assert!(f.check_granularity(h, Unit::Minutes, 10).is_err());
        assert!(f.check_granularity(h, Unit::Days, 5).is_ok());
        assert!(f.check_granularity(h, Unit::Months, 3).is_ok());
        assert!(f.check_granularity(h, Unit::Weeks, 2).is_err());
        assert!(matches!(
            f.check_granularity(h, Unit::Years, 1),
            Err(FetchError::UnsupportedGranularity { unit: Unit::Years, .. })
        ));
    }

    #[test]
    fn url_encodes_interval_and_exclusive_end() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let url = YahooFetcher::chart_url("TCS.NS", day(1), day(2), Unit::Weeks, 1);
        assert!(url.contains("/TCS.NS?period1=1704067200&period2=1704240000&interval=1wk"));
    }
}
