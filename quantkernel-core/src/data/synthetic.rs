//! Offline provider producing a deterministic random walk.
//!
//! Each symbol gets its own `StdRng`, seeded from a BLAKE3 hash of the base
//! seed and the symbol, so the same request always yields the same candles
//! regardless of which other symbols were generated before it.

use chrono::{Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{unsupported, FetchError, FetchMode, Provider, ProviderFetcher, Unit};
use crate::domain::Candle;

const BASE_PRICE: f64 = 100.0;
const CLOSE_STEP_SD: f64 = 0.8;
const OPEN_GAP_SD: f64 = 0.4;
/// 09:15 to 15:30.
const SESSION_MINUTES: u32 = 375;

#[derive(Debug, Clone)]
pub struct SyntheticFetcher {
    seed: u64,
    session_date: Option<NaiveDate>,
}

impl Default for SyntheticFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticFetcher {
    pub fn new() -> Self {
        Self {
            seed: 42,
            session_date: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Pin the intraday session date (defaults to today).
    pub fn with_session_date(mut self, date: NaiveDate) -> Self {
        self.session_date = Some(date);
        self
    }

    fn rng_for(&self, symbol: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(hasher.finalize().as_bytes());
        StdRng::from_seed(seed)
    }

    fn session_open(date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN))
    }

    /// Timestamps from `start` through the end of `end`, one per `interval` units.
    fn historical_timestamps(start: NaiveDate, end: NaiveDate, unit: Unit, interval: u32) -> Vec<NaiveDateTime> {
        let origin = start.and_time(NaiveTime::MIN);
        let mut out = Vec::new();
        for k in 0u32.. {
            let step = k.saturating_mul(interval);
            let ts = match unit {
                Unit::Minutes => origin.checked_add_signed(Duration::minutes(i64::from(step))),
                Unit::Hours => origin.checked_add_signed(Duration::hours(i64::from(step))),
                Unit::Days => origin.checked_add_signed(Duration::days(i64::from(step))),
                Unit::Weeks => origin.checked_add_signed(Duration::weeks(i64::from(step))),
                // Offset from the origin each time so month-end clamping never drifts.
                Unit::Months => origin.checked_add_months(Months::new(step)),
                Unit::Years => None,
            };
            match ts {
                Some(ts) if ts.date() <= end => out.push(ts),
                _ => break,
            }
        }
        out
    }

    fn intraday_timestamps(date: NaiveDate, unit: Unit, interval: u32) -> Vec<NaiveDateTime> {
        let unit_minutes = match unit {
            Unit::Minutes => 1,
            Unit::Hours => 60,
            _ => SESSION_MINUTES,
        };
        let step = interval.saturating_mul(unit_minutes).max(1);
        let rows = (SESSION_MINUTES / step).max(1);
        let open = Self::session_open(date);
        (0..rows)
            .map(|i| open + Duration::minutes(i64::from(i * step)))
            .collect()
    }

    /// Approximately standard normal: Irwin–Hall sum of 12 uniforms.
    fn normal(rng: &mut StdRng) -> f64 {
        (0..12).map(|_| rng.gen::<f64>()).sum::<f64>() - 6.0
    }

    /// Random-walk candles over `timestamps` for `symbol`.
    pub fn generate(&self, symbol: &str, timestamps: &[NaiveDateTime]) -> Vec<Candle> {
        let mut rng = self.rng_for(symbol);
        let mut close = BASE_PRICE;
        timestamps
            .iter()
            .map(|&timestamp| {
                close = (close + CLOSE_STEP_SD * Self::normal(&mut rng)).max(1.0);
                let open = (close + OPEN_GAP_SD * Self::normal(&mut rng)).max(0.5);
                let high = open.max(close) + rng.gen_range(0.2..1.0);
                let low = (open.min(close) - rng.gen_range(0.2..1.0)).max(0.01);
                let volume = f64::from(rng.gen_range(100_000u32..900_000));
                Candle::unadjusted(timestamp, open, high, low, close, volume)
            })
            .collect()
    }
}

impl ProviderFetcher for SyntheticFetcher {
    const PROVIDER: Provider = Provider::Synthetic;
    const SUPPORTS_INTRADAY: bool = true;
    const SUPPORTS_HISTORICAL: bool = true;

    fn check_granularity(&self, mode: FetchMode, unit: Unit, interval: u32) -> Result<(), FetchError> {
        if unit == Unit::Years {
            return Err(unsupported::<Self>(mode, unit, interval, "any unit except years"));
        }
        Ok(())
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
        let timestamps = Self::historical_timestamps(start, end, unit, interval);
        Ok(self.generate(symbol, &timestamps))
    }

    fn fetch_intraday(
        &self,
        symbol: &str,
        unit: Unit,
        interval: u32,
        _exchange: &str,
    ) -> Result<Vec<Candle>, FetchError> {
        let date = self.session_date.unwrap_or_else(|| Local::now().date_naive());
        let timestamps = Self::intraday_timestamps(date, unit, interval);
        Ok(self.generate(symbol, &timestamps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_symbol_same_candles() {
        let f = SyntheticFetcher::new();
        let a = f.fetch_historical("INFY", day(2024, 1, 1), day(2024, 3, 31), Unit::Days, 1, "NSE").unwrap();
        let b = f.fetch_historical("INFY", day(2024, 1, 1), day(2024, 3, 31), Unit::Days, 1, "NSE").unwrap();
        assert_eq!(a, b);

        let other = f.fetch_historical("TCS", day(2024, 1, 1), day(2024, 3, 31), Unit::Days, 1, "NSE").unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn candles_are_sane() {
        let f = SyntheticFetcher::new().with_seed(7);
        let candles = f.fetch_historical("X", day(2024, 1, 1), day(2024, 12, 31), Unit::Days, 1, "NSE").unwrap();
        assert_eq!(candles.len(), 366);
        for c in &candles {
            assert!(c.is_sane(), "{c:?}");
            assert!((100_000.0..900_000.0).contains(&c.volume));
        }
    }

    #[test]
    fn historical_range_is_inclusive() {
        let ts = SyntheticFetcher::historical_timestamps(day(2024, 1, 1), day(2024, 1, 10), Unit::Days, 1);
        assert_eq!(ts.len(), 10);
        assert_eq!(ts[9].date(), day(2024, 1, 10));

        let ts = SyntheticFetcher::historical_timestamps(day(2024, 1, 1), day(2024, 1, 1), Unit::Hours, 6);
        assert_eq!(ts.len(), 4);
    }

    #[test]
    fn months_step_from_origin() {
        let ts = SyntheticFetcher::historical_timestamps(day(2024, 1, 31), day(2024, 6, 30), Unit::Months, 1);
        let dates: Vec<_> = ts.iter().map(|t| t.date()).collect();
        assert_eq!(
            dates,
            vec![day(2024, 1, 31), day(2024, 2, 29), day(2024, 3, 31), day(2024, 4, 30), day(2024, 5, 31)]
        );
    }

    #[test]
    fn intraday_session_starts_at_open() {
        let f = SyntheticFetcher::new().with_session_date(day(2025, 1, 2));
        let candles = f.fetch_intraday("X", Unit::Minutes, 5, "NSE").unwrap();
        assert_eq!(candles.len(), 75);
        assert_eq!(candles[0].timestamp.to_string(), "2025-01-02 09:15:00");
        assert_eq!(candles[74].timestamp.to_string(), "2025-01-02 15:25:00");

        let hourly = f.fetch_intraday("X", Unit::Hours, 1, "NSE").unwrap();
        assert_eq!(hourly.len(), 6);
    }

    #[test]
    fn years_are_rejected() {
        let f = SyntheticFetcher::new();
        assert!(matches!(
            f.check_granularity(FetchMode::Historical, Unit::Years, 1),
            Err(FetchError::UnsupportedGranularity { provider: Provider::Synthetic, .. })
        ));
        assert!(f.check_granularity(FetchMode::Intraday, Unit::Minutes, 7).is_ok());
    }
}
