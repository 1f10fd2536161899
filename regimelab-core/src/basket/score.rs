//! Linear satellite score.

use serde::{Deserialize, Serialize};

/// Sentinels substituted for non-finite feature values.
pub const RETURN_SENTINEL: f64 = -1.0;
pub const MOMENTUM_SENTINEL: f64 = -1.0;
pub const VOLUME_SENTINEL: f64 = 0.0;
pub const CORRELATION_SENTINEL: f64 = 0.0;

/// Weights for (return, momentum, volume change, correlation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub ret: f64,
    pub momentum: f64,
    pub volume_change: f64,
    pub correlation: f64,
}

impl ScoreWeights {
    pub fn bull() -> Self {
        Self {
            ret: 0.45,
            momentum: 0.35,
            volume_change: 0.15,
            correlation: 0.05,
        }
    }

    pub fn side() -> Self {
        Self {
            ret: 0.30,
            momentum: 0.30,
            volume_change: 0.10,
            correlation: 0.30,
        }
    }
}

/// Per-asset inputs to the score at one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetFeatures {
    pub ret: f64,
    pub momentum: f64,
    pub volume_change: f64,
    pub correlation: f64,
}

impl AssetFeatures {
    /// Replace non-finite values with their sentinel.
    pub fn sanitized(self) -> Self {
        fn or(v: f64, sentinel: f64) -> f64 {
            if v.is_finite() {
                v
            } else {
                sentinel
            }
        }
        Self {
            ret: or(self.ret, RETURN_SENTINEL),
            momentum: or(self.momentum, MOMENTUM_SENTINEL),
            volume_change: or(self.volume_change, VOLUME_SENTINEL),
            correlation: or(self.correlation, CORRELATION_SENTINEL),
        }
    }

    pub fn score(&self, w: &ScoreWeights) -> f64 {
        let f = self.sanitized();
        w.ret * f.ret
            + w.momentum * f.momentum
            + w.volume_change * f.volume_change
            + w.correlation * f.correlation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_replace_undefined() {
        let f = AssetFeatures {
            ret: f64::NAN,
            momentum: f64::INFINITY,
            volume_change: f64::NAN,
            correlation: f64::NAN,
        }
        .sanitized();
        assert_eq!(f.ret, -1.0);
        assert_eq!(f.momentum, -1.0);
        assert_eq!(f.volume_change, 0.0);
        assert_eq!(f.correlation, 0.0);
    }

    #[test]
    fn bull_score_is_linear() {
        let f = AssetFeatures {
            ret: 0.2,
            momentum: 0.1,
            volume_change: 0.5,
            correlation: 0.8,
        };
        let expected = 0.45 * 0.2 + 0.35 * 0.1 + 0.15 * 0.5 + 0.05 * 0.8;
        assert!((f.score(&ScoreWeights::bull()) - expected).abs() < 1e-12);
    }
}
