//! Per-asset technical indicators.
//!
//! Every indicator implements [`Indicator`]: a pure function from an asset's
//! own bar history to a numeric series of the same length. Values are
//! computed once per asset by [`builder::build_series`] and stored on the
//! [`Bar`] rows before any regime, basket or simulation logic runs.
//!
//! # Look-ahead contamination guard
//! No value at bar t may depend on bar t+1 or later. Every indicator must
//! produce the same prefix on a truncated series as on the full series.

pub mod atr;
pub mod builder;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod trailing_low;

pub use atr::Atr;
pub use builder::{build_series, canonicalize, IndicatorConfig};
pub use roc::{Roc, RocSource};
pub use rsi::Rsi;
pub use sma::{rolling_mean, Sma};
pub use trailing_low::TrailingLow;

use crate::domain::Bar;

pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of leading bars that cannot carry a full window.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high/low = ±1.0 around
/// the body, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use crate::domain::RawBar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::from_raw(&RawBar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            })
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
