//! Component identity: deterministic descriptors for indicators and strategies.
//!
//! - `ParamValue`: a single typed parameter value with total equality.
//! - `Descriptor`: versioned (kind, sorted parameters) identity; the dedup key
//!   used by both registries.
//! - `DescriptorHash`: blake3 fingerprint of a descriptor's canonical form.
//! - `ComponentConfig`: the user-facing (type, params) bag read from TOML and
//!   turned into components by the factories.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Version of the descriptor layout. Bumped whenever the canonical form changes.
pub const DESCRIPTOR_VERSION: u16 = 1;

/// A single parameter value.
///
/// Floats compare and hash by bit pattern (with `-0.0` folded into `0.0`), so
/// `ParamValue` has total equality and can sit inside hashed keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    fn float_bits(v: f64) -> u64 {
        if v == 0.0 {
            0.0f64.to_bits()
        } else {
            v.to_bits()
        }
    }

    /// Numeric view: integers widen to f64, text has none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }

    /// Integer view: floats with an integral value are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ParamValue::Int(a), ParamValue::Int(b)) => a == b,
            (ParamValue::Float(a), ParamValue::Float(b)) => {
                Self::float_bits(*a) == Self::float_bits(*b)
            }
            (ParamValue::Text(a), ParamValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ParamValue {}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ParamValue::Int(v) => v.hash(state),
            ParamValue::Float(v) => Self::float_bits(*v).hash(state),
            ParamValue::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v:?}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Deterministic identity of a configured component.
///
/// Parameters live in a `BTreeMap`, so two descriptors built with the same
/// parameters in a different order are equal and hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    pub version: u16,
    pub kind: String,
    pub params: BTreeMap<String, ParamValue>,
}

impl Descriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            version: DESCRIPTOR_VERSION,
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter insertion.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Blake3 fingerprint of the canonical form.
    pub fn fingerprint(&self) -> DescriptorHash {
        DescriptorHash::from_bytes(self.to_string().as_bytes())
    }
}

/// Canonical form: `v{version}:{kind}(k1=v1,k2=v2)` with keys sorted.
impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}:{}(", self.version, self.kind)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str(")")
    }
}

/// Hex-encoded blake3 hash of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DescriptorHash(pub String);

impl DescriptorHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }
}

impl fmt::Display for DescriptorHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration of a single indicator or strategy, as written in TOML.
///
/// ```toml
/// [[strategies]]
/// type = "ma_crossover"
/// params = { fast = 7, slow = 21 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentConfig {
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl ComponentConfig {
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parameter_order_does_not_matter() {
        let a = Descriptor::new("mcginley").with("period", 14usize).with("k", 0.6);
        let b = Descriptor::new("mcginley").with("k", 0.6).with("period", 14usize);
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn different_params_differ() {
        let a = Descriptor::new("ma").with("period", 7usize);
        let b = Descriptor::new("ma").with("period", 21usize);
        assert_ne!(a, b);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn different_kinds_differ() {
        let a = Descriptor::new("ma").with("period", 7usize);
        let b = Descriptor::new("vwap").with("period", 7usize);
        assert_ne!(a, b);
    }

    #[test]
    fn negative_zero_equals_zero() {
        assert_eq!(ParamValue::Float(-0.0), ParamValue::Float(0.0));
    }

    #[test]
    fn int_and_float_are_distinct_values() {
        assert_ne!(ParamValue::Int(7), ParamValue::Float(7.0));
        assert_eq!(ParamValue::Float(7.0).as_i64(), Some(7));
        assert_eq!(ParamValue::Float(7.5).as_i64(), None);
    }

    #[test]
    fn canonical_form_is_sorted() {
        let d = Descriptor::new("ma").with("source", "close").with("period", 7usize);
        assert_eq!(d.to_string(), "v1:ma(period=7,source=close)");
    }

    #[test]
    fn component_config_from_toml() {
        let cfg: ComponentConfig =
            toml::from_str("type = \"mcginley\"\nparams = { period = 14, k = 0.6, source = \"close\" }")
                .unwrap();
        assert_eq!(cfg.component_type, "mcginley");
        assert_eq!(cfg.params["period"], ParamValue::Int(14));
        assert_eq!(cfg.params["k"], ParamValue::Float(0.6));
        assert_eq!(cfg.params["source"], ParamValue::Text("close".into()));
    }

    #[test]
    fn component_config_params_default_to_empty() {
        let cfg: ComponentConfig = toml::from_str("type = \"day_range_pct\"").unwrap();
        assert!(cfg.params.is_empty());
    }
}
