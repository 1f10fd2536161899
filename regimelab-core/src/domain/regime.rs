//! Market regime classification from the reference asset's bar.
//!
//! The classifier is a pure function of (close, ma_long, rsi). BEAR is
//! checked first so it dominates whenever its condition holds.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::bar::Bar;

/// RSI below this is BEAR regardless of trend.
pub const BEAR_RSI: f64 = 40.0;
/// RSI above this (with price above trend) is BULL.
pub const BULL_RSI: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regime {
    Bull,
    Side,
    Bear,
    Unknown,
}

impl Regime {
    pub fn classify(bar: &Bar) -> Self {
        classify_values(bar.close, bar.ma_long, bar.rsi)
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::Bull => "BULL",
            Regime::Side => "SIDE",
            Regime::Bear => "BEAR",
            Regime::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

pub fn classify_values(close: f64, ma_long: f64, rsi: f64) -> Regime {
    if !close.is_finite() || !ma_long.is_finite() || !rsi.is_finite() {
        return Regime::Unknown;
    }
    if close < ma_long || rsi < BEAR_RSI {
        Regime::Bear
    } else if close > ma_long && rsi > BULL_RSI {
        Regime::Bull
    } else {
        Regime::Side
    }
}
