//! Rate of Change over `period` bars, as a fraction.
//!
//! ROC[t] = value[t] / value[t-period] - 1. Used for close momentum and for
//! volume change. Division by zero or missing inputs yield NaN.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RocSource {
    Close,
    Volume,
}

#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
    source: RocSource,
    name: String,
}

impl Roc {
    pub fn new(period: usize, source: RocSource) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        let prefix = match source {
            RocSource::Close => "roc",
            RocSource::Volume => "vroc",
        };
        Self {
            period,
            source,
            name: format!("{prefix}_{period}"),
        }
    }

    pub fn close(period: usize) -> Self {
        Self::new(period, RocSource::Close)
    }

    pub fn volume(period: usize) -> Self {
        Self::new(period, RocSource::Volume)
    }

    fn value(&self, bar: &Bar) -> f64 {
        match self.source {
            RocSource::Close => bar.close,
            RocSource::Volume => bar.volume,
        }
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        for i in self.period..n {
            let prev = self.value(&bars[i - self.period]);
            let curr = self.value(&bars[i]);
            let roc = curr / prev - 1.0;
            if roc.is_finite() {
                result[i] = roc;
            }
        }
        result
    }
}
