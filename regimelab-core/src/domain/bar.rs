//! Bar: the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV row for a single asset on a single day, as supplied by the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl RawBar {
    /// Basic OHLC sanity check: high >= low, high >= open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.close.is_nan() || self.high.is_nan() || self.low.is_nan() || self.open.is_nan() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
    }
}

/// OHLCV bar plus the derived indicator fields.
///
/// Derived fields are `f64::NAN` until their rolling window has filled.
/// A void bar (all NaN) stands in for a date the asset has no data on
/// after alignment to the reference timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub ma_short: f64,
    pub ma_long: f64,
    /// Percentage momentum as a fraction (0.05 = +5%).
    pub momentum: f64,
    /// RSI in 0..=100.
    pub rsi: f64,
    pub atr: f64,
    /// Lowest close over the trailing rebound lookback, current bar included.
    pub trailing_low: f64,
}

impl Bar {
    /// Void bar for a date with no data.
    pub fn void(date: NaiveDate) -> Self {
        Self {
            date,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            volume: f64::NAN,
            ma_short: f64::NAN,
            ma_long: f64::NAN,
            momentum: f64::NAN,
            rsi: f64::NAN,
            atr: f64::NAN,
            trailing_low: f64::NAN,
        }
    }

    /// Bar from raw OHLCV with every derived field still undefined.
    pub fn from_raw(raw: &RawBar) -> Self {
        Self {
            date: raw.date,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
            ..Self::void(raw.date)
        }
    }

    pub fn has_price(&self) -> bool {
        self.close.is_finite()
    }

    pub fn is_void(&self) -> bool {
        !self.has_price()
    }

    /// True when every field the entry/exit rules read is defined.
    pub fn is_tradable(&self) -> bool {
        self.close.is_finite()
            && self.ma_short.is_finite()
            && self.ma_long.is_finite()
            && self.rsi.is_finite()
    }

    /// Rebound from the trailing low, in percent. 0.0 when the low is unusable.
    pub fn rebound_pct(&self) -> f64 {
        if self.trailing_low.is_finite() && self.trailing_low > 0.0 && self.close.is_finite() {
            (self.close - self.trailing_low) / self.trailing_low * 100.0
        } else {
            0.0
        }
    }
}
