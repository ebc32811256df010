//! Factory system: converts `ComponentConfig` into runtime trait objects.
//!
//! Each factory maps a stable string tag to a constructor plus the parameter
//! schema it accepts. Config parameters are validated against the schema
//! (unknown names and type mismatches are errors, missing names take their
//! default) before the constructor runs. New kinds can be registered at
//! runtime.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::descriptor::{ComponentConfig, ParamValue};
use crate::indicators::mcginley::{DEFAULT_K, DEFAULT_PERIOD};
use crate::indicators::{DayRangePct, McGinley, MovingAverage, Vwap};

use super::indicator::{Indicator, PriceSource};
use super::strategy::{DayRangeBreakout, MaCrossover, McGinleyBreakout, Strategy, VwapCrossover};

// ─── Error type ──────────────────────────────────────────────────────

/// Errors that can occur during component construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FactoryError {
    #[error("unknown {category} type: {kind}")]
    UnknownKind {
        category: &'static str,
        kind: String,
    },
    #[error("{kind}: unknown parameter '{param}'")]
    UnknownParam { kind: String, param: String },
    #[error("{kind}: invalid parameter '{param}': {reason}")]
    InvalidParam {
        kind: String,
        param: String,
        reason: String,
    },
}

// ─── Parameter schema ────────────────────────────────────────────────

/// Accepted shape of a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Integer >= 1.
    PositiveInt,
    /// Finite float > 0.
    PositiveFloat,
    /// Any finite float.
    Float,
    /// One of the base price columns.
    Source,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: ParamValue,
}

impl ParamSpec {
    pub fn positive_int(name: &'static str, default: i64) -> Self {
        Self {
            name,
            kind: ParamKind::PositiveInt,
            default: ParamValue::Int(default),
        }
    }

    pub fn positive_float(name: &'static str, default: f64) -> Self {
        Self {
            name,
            kind: ParamKind::PositiveFloat,
            default: ParamValue::Float(default),
        }
    }

    pub fn float(name: &'static str, default: f64) -> Self {
        Self {
            name,
            kind: ParamKind::Float,
            default: ParamValue::Float(default),
        }
    }

    pub fn source(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Source,
            default: ParamValue::Text(PriceSource::Close.as_str().to_string()),
        }
    }

    /// Check `value` against this parameter spec and return its normalized form.
    fn check(&self, value: &ParamValue) -> Result<ParamValue, String> {
        match self.kind {
            ParamKind::PositiveInt => match value.as_i64() {
                Some(v) if v >= 1 => Ok(ParamValue::Int(v)),
                Some(v) => Err(format!("must be >= 1, got {v}")),
                None => Err(format!("expected an integer, got {value}")),
            },
            ParamKind::PositiveFloat => match value.as_f64() {
                Some(v) if v > 0.0 && v.is_finite() => Ok(ParamValue::Float(v)),
                Some(v) => Err(format!("must be a positive number, got {v}")),
                None => Err(format!("expected a number, got {value}")),
            },
            ParamKind::Float => match value.as_f64() {
                Some(v) if v.is_finite() => Ok(ParamValue::Float(v)),
                Some(v) => Err(format!("must be finite, got {v}")),
                None => Err(format!("expected a number, got {value}")),
            },
            ParamKind::Source => match value.as_str() {
                Some(s) => s
                    .parse::<PriceSource>()
                    .map(|p| ParamValue::Text(p.as_str().to_string())),
                None => Err(format!("expected a price column name, got {value}")),
            },
        }
    }
}

/// Validated parameters with every schema entry present.
#[derive(Debug, Clone)]
pub struct Params {
    kind: String,
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    fn get(&self, name: &str) -> Result<&ParamValue, FactoryError> {
        self.values.get(name).ok_or_else(|| FactoryError::UnknownParam {
            kind: self.kind.clone(),
            param: name.to_string(),
        })
    }

    fn invalid(&self, name: &str, reason: impl Into<String>) -> FactoryError {
        FactoryError::InvalidParam {
            kind: self.kind.clone(),
            param: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn usize(&self, name: &str) -> Result<usize, FactoryError> {
        self.get(name)?
            .as_i64()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| self.invalid(name, "expected a non-negative integer"))
    }

    pub fn u32(&self, name: &str) -> Result<u32, FactoryError> {
        self.get(name)?
            .as_i64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.invalid(name, "expected a non-negative integer"))
    }

    pub fn f64(&self, name: &str) -> Result<f64, FactoryError> {
        self.get(name)?
            .as_f64()
            .ok_or_else(|| self.invalid(name, "expected a number"))
    }

    pub fn source(&self, name: &str) -> Result<PriceSource, FactoryError> {
        let value = self.get(name)?;
        value
            .as_str()
            .ok_or_else(|| self.invalid(name, "expected a price column name"))?
            .parse()
            .map_err(|e: String| self.invalid(name, e))
    }

    /// Reject `name_hi <= name_lo`.
    pub fn require_ordered(&self, name_lo: &str, name_hi: &str) -> Result<(), FactoryError> {
        let (lo, hi) = (self.f64(name_lo)?, self.f64(name_hi)?);
        if hi <= lo {
            return Err(self.invalid(name_hi, format!("must be greater than {name_lo}")));
        }
        Ok(())
    }
}

// ─── Generic factory ─────────────────────────────────────────────────

pub type Constructor<T> = fn(&Params) -> Result<Box<T>, FactoryError>;

struct Entry<T: ?Sized> {
    schema: Vec<ParamSpec>,
    build: Constructor<T>,
}

/// String tag → (parameter schema, constructor).
pub struct Factory<T: ?Sized> {
    category: &'static str,
    entries: BTreeMap<String, Entry<T>>,
}

pub type IndicatorFactory = Factory<dyn Indicator>;
pub type StrategyFactory = Factory<dyn Strategy>;

impl<T: ?Sized> Factory<T> {
    pub fn empty(category: &'static str) -> Self {
        Self {
            category,
            entries: BTreeMap::new(),
        }
    }

    /// Register (or replace) a kind.
    pub fn register(&mut self, kind: impl Into<String>, schema: Vec<ParamSpec>, build: Constructor<T>) {
        self.entries.insert(kind.into(), Entry { schema, build });
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Registered kinds with their schemas, sorted by kind.
    pub fn kinds(&self) -> impl Iterator<Item = (&str, &[ParamSpec])> {
        self.entries
            .iter()
            .map(|(k, e)| (k.as_str(), e.schema.as_slice()))
    }

    pub fn schema(&self, kind: &str) -> Option<&[ParamSpec]> {
        self.entries.get(kind).map(|e| e.schema.as_slice())
    }

    /// Validate `config` and construct the component.
    pub fn create(&self, config: &ComponentConfig) -> Result<Box<T>, FactoryError> {
        let kind = config.component_type.as_str();
        let entry = self.entries.get(kind).ok_or_else(|| FactoryError::UnknownKind {
            category: self.category,
            kind: kind.to_string(),
        })?;

        if let Some(name) = config
            .params
            .keys()
            .find(|name| !entry.schema.iter().any(|s| s.name == name.as_str()))
        {
            return Err(FactoryError::UnknownParam {
                kind: kind.to_string(),
                param: name.clone(),
            });
        }

        let mut values = BTreeMap::new();
        for spec in &entry.schema {
            let value = match config.params.get(spec.name) {
                Some(v) => spec.check(v).map_err(|reason| FactoryError::InvalidParam {
                    kind: kind.to_string(),
                    param: spec.name.to_string(),
                    reason,
                })?,
                None => spec.default.clone(),
            };
            values.insert(spec.name.to_string(), value);
        }

        (entry.build)(&Params {
            kind: kind.to_string(),
            values,
        })
    }

    /// Construct every config in order, stopping at the first failure.
    pub fn create_all(&self, configs: &[ComponentConfig]) -> Result<Vec<Box<T>>, FactoryError> {
        configs.iter().map(|c| self.create(c)).collect()
    }
}

// ─── Indicator factory ───────────────────────────────────────────────

impl Factory<dyn Indicator> {
    /// Factory with `ma`, `mcginley`, `vwap` and `day_range_pct` registered.
    pub fn with_builtins() -> Self {
        let mut f = Self::empty("indicator");
        f.register(
            "ma",
            vec![ParamSpec::positive_int("period", 20), ParamSpec::source("source")],
            |p| {
                Ok(Box::new(MovingAverage::with_source(
                    p.usize("period")?,
                    p.source("source")?,
                )))
            },
        );
        f.register(
            "mcginley",
            vec![
                ParamSpec::positive_int("period", DEFAULT_PERIOD as i64),
                ParamSpec::positive_float("k", DEFAULT_K),
                ParamSpec::source("source"),
            ],
            |p| {
                Ok(Box::new(McGinley::new(
                    p.usize("period")?,
                    p.f64("k")?,
                    p.source("source")?,
                )))
            },
        );
        f.register("vwap", vec![ParamSpec::positive_int("days", 1)], |p| {
            Ok(Box::new(Vwap::new(p.u32("days")?)))
        });
        f.register("day_range_pct", Vec::new(), |_| Ok(Box::new(DayRangePct)));
        f
    }
}

// ─── Strategy factory ────────────────────────────────────────────────

impl Factory<dyn Strategy> {
    /// Factory with the four built-in strategies registered.
    pub fn with_builtins() -> Self {
        let mut f = Self::empty("strategy");
        f.register(
            "ma_crossover",
            vec![
                ParamSpec::positive_int("fast", 7),
                ParamSpec::positive_int("slow", 21),
            ],
            |p| {
                p.require_ordered("fast", "slow")?;
                Ok(Box::new(MaCrossover::new(p.usize("fast")?, p.usize("slow")?)))
            },
        );
        f.register(
            "vwap_crossover",
            vec![
                ParamSpec::positive_int("fast_days", 1),
                ParamSpec::positive_int("slow_days", 7),
            ],
            |p| {
                p.require_ordered("fast_days", "slow_days")?;
                Ok(Box::new(VwapCrossover::new(
                    p.u32("fast_days")?,
                    p.u32("slow_days")?,
                )))
            },
        );
        f.register(
            "mcginley_breakout",
            vec![
                ParamSpec::positive_int("period", DEFAULT_PERIOD as i64),
                ParamSpec::positive_float("k", DEFAULT_K),
                ParamSpec::source("source"),
            ],
            |p| {
                Ok(Box::new(McGinleyBreakout::new(
                    p.usize("period")?,
                    p.f64("k")?,
                    p.source("source")?,
                )))
            },
        );
        f.register(
            "day_range_breakout",
            vec![ParamSpec::float("threshold", 0.05)],
            |p| Ok(Box::new(DayRangeBreakout::new(p.f64("threshold")?))),
        );
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(component_type: &str, params: &[(&str, ParamValue)]) -> ComponentConfig {
        let mut cfg = ComponentConfig::new(component_type);
        for (name, value) in params {
            cfg.params.insert(name.to_string(), value.clone());
        }
        cfg
    }

    fn bare(component_type: &str) -> ComponentConfig {
        ComponentConfig::new(component_type)
    }

    // ── Indicators ──

    #[test]
    fn indicator_ma_with_period() {
        let ind = IndicatorFactory::with_builtins()
            .create(&config("ma", &[("period", 7.into())]))
            .unwrap();
        assert_eq!(ind.columns(), vec!["ma_7"]);
    }

    #[test]
    fn indicator_mcginley_defaults() {
        let ind = IndicatorFactory::with_builtins().create(&bare("mcginley")).unwrap();
        assert_eq!(ind.columns(), vec!["mcginley_14"]);
        assert_eq!(ind.descriptor(), McGinley::default().descriptor());
    }

    #[test]
    fn indicator_vwap_and_day_range() {
        let f = IndicatorFactory::with_builtins();
        let vwap = f.create(&config("vwap", &[("days", 7.into())])).unwrap();
        assert_eq!(vwap.columns(), vec!["vwap_7d"]);
        let dr = f.create(&bare("day_range_pct")).unwrap();
        assert_eq!(dr.columns(), vec!["day_range_pct"]);
    }

    #[test]
    fn integral_float_is_normalized_to_int() {
        let f = IndicatorFactory::with_builtins();
        let a = f.create(&config("ma", &[("period", 7.0.into())])).unwrap();
        let b = f.create(&config("ma", &[("period", 7.into())])).unwrap();
        assert_eq!(a.descriptor(), b.descriptor());
    }

    #[test]
    fn int_k_is_normalized_to_float() {
        let f = IndicatorFactory::with_builtins();
        let a = f.create(&config("mcginley", &[("k", 1.into())])).unwrap();
        let b = f.create(&config("mcginley", &[("k", 1.0.into())])).unwrap();
        assert_eq!(a.descriptor(), b.descriptor());
    }

    // ── Strategies ──

    #[test]
    fn strategy_defaults() {
        let f = StrategyFactory::with_builtins();
        for kind in [
            "ma_crossover",
            "vwap_crossover",
            "mcginley_breakout",
            "day_range_breakout",
        ] {
            let s = f.create(&bare(kind)).unwrap();
            assert_eq!(s.descriptor().kind, kind);
        }
    }

    #[test]
    fn strategy_ma_crossover_params() {
        let s = StrategyFactory::with_builtins()
            .create(&config("ma_crossover", &[("fast", 5.into()), ("slow", 50.into())]))
            .unwrap();
        assert_eq!(s.descriptor(), MaCrossover::new(5, 50).descriptor());
    }

    #[test]
    fn strategy_inverted_crossover_is_rejected() {
        let err = StrategyFactory::with_builtins()
            .create(&config("ma_crossover", &[("fast", 30.into()), ("slow", 10.into())]))
            .err()
            .unwrap();
        assert!(matches!(err, FactoryError::InvalidParam { param, .. } if param == "slow"));
    }

    // ── Errors ──

    #[test]
    fn unknown_kind_returns_error() {
        let err = StrategyFactory::with_builtins()
            .create(&bare("rsi_reversal"))
            .err()
            .unwrap();
        assert_eq!(
            err,
            FactoryError::UnknownKind {
                category: "strategy",
                kind: "rsi_reversal".into()
            }
        );
    }

    #[test]
    fn unknown_param_returns_error() {
        let err = IndicatorFactory::with_builtins()
            .create(&config("ma", &[("length", 7.into())]))
            .err()
            .unwrap();
        assert!(matches!(err, FactoryError::UnknownParam { param, .. } if param == "length"));
    }

    #[test]
    fn type_mismatch_returns_error() {
        let f = IndicatorFactory::with_builtins();
        for bad in [
            config("ma", &[("period", "seven".into())]),
            config("ma", &[("period", 0.into())]),
            config("ma", &[("period", 7.5.into())]),
            config("ma", &[("source", "typical".into())]),
            config("mcginley", &[("k", (-1.0).into())]),
        ] {
            assert!(
                matches!(f.create(&bad), Err(FactoryError::InvalidParam { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    // ── Registry ──

    #[test]
    fn custom_kind_can_be_registered() {
        let mut f = IndicatorFactory::with_builtins();
        assert!(!f.contains("ma_fast"));
        f.register("ma_fast", Vec::new(), |_| Ok(Box::new(MovingAverage::new(3))));
        let ind = f.create(&bare("ma_fast")).unwrap();
        assert_eq!(ind.columns(), vec!["ma_3"]);
    }

    #[test]
    fn kinds_are_listed_with_schemas() {
        let f = StrategyFactory::with_builtins();
        let kinds: Vec<&str> = f.kinds().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                "day_range_breakout",
                "ma_crossover",
                "mcginley_breakout",
                "vwap_crossover"
            ]
        );
        let schema = f.schema("mcginley_breakout").unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema[1].default, ParamValue::Float(0.6));
    }

    #[test]
    fn create_all_stops_at_first_error() {
        let f = IndicatorFactory::with_builtins();
        assert_eq!(f.create_all(&[bare("ma"), bare("vwap")]).unwrap().len(), 2);
        assert!(f.create_all(&[bare("ma"), bare("nope")]).is_err());
    }
}
