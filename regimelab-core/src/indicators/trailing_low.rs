//! Lowest close over the trailing window, current bar included.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct TrailingLow {
    period: usize,
    name: String,
}

impl TrailingLow {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "trailing low period must be >= 1");
        Self {
            period,
            name: format!("low_{period}"),
        }
    }
}

impl Indicator for TrailingLow {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }
        for i in (self.period - 1)..n {
            let window = &bars[(i + 1 - self.period)..=i];
            if window.iter().any(|b| !b.close.is_finite()) {
                continue;
            }
            result[i] = window.iter().map(|b| b.close).fold(f64::INFINITY, f64::min);
        }
        result
    }
}
