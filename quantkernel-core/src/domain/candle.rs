//! Candle: the canonical market data unit exchanged between all components.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single symbol over one time bucket.
///
/// Timestamps are exchange-local wall-clock times. Every adapter converts its
/// provider's representation (epoch seconds, RFC 3339 with offset, ...) into
/// this form, so all candles of one table share the same clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

impl Candle {
    /// Candle for providers without an adjusted close: `adj_close` mirrors `close`.
    pub fn unadjusted(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            adj_close: close,
            volume,
        }
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.adj_close.is_nan()
    }

    /// OHLC ordering check: high bounds the body from above, low from below.
    ///
    /// Not enforced on construction; consumers that care call this.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
            && self.volume >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_candle() -> Candle {
        Candle {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 15, 0)
                .unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            adj_close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle().is_sane());
    }

    #[test]
    fn candle_detects_void() {
        let mut candle = sample_candle();
        candle.close = f64::NAN;
        assert!(candle.is_void());
        assert!(!candle.is_sane());
    }

    #[test]
    fn candle_detects_inverted_range() {
        let mut candle = sample_candle();
        candle.high = 97.0;
        assert!(!candle.is_sane());
    }

    #[test]
    fn typical_price() {
        let candle = sample_candle();
        let expected = (105.0 + 98.0 + 103.0) / 3.0;
        assert!((candle.typical_price() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn unadjusted_mirrors_close() {
        let c = sample_candle();
        let u = Candle::unadjusted(c.timestamp, c.open, c.high, c.low, c.close, c.volume);
        assert_eq!(u.adj_close, u.close);
    }
}
