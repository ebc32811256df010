//! Ternary trading signal emitted per row by strategies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-row classification produced by a strategy.
///
/// Strategies never emit numeric scores; consumers (chart markers, alert
/// filters) only test membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Signal::Hold)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_hold() {
        assert_eq!(Signal::default(), Signal::Hold);
        assert!(Signal::default().is_hold());
    }

    #[test]
    fn serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Signal::Buy).unwrap(), "\"BUY\"");
        let s: Signal = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(s, Signal::Sell);
    }
}
