//! Strategy parameters searched by the optimizer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One point of the parameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Minimum rebound from the trailing low, in percent.
    pub rebound_threshold: f64,
    /// Minimum RSI for an entry.
    pub rsi_threshold: f64,
}

impl ParameterSet {
    pub fn new(rebound_threshold: f64, rsi_threshold: f64) -> Self {
        Self {
            rebound_threshold,
            rsi_threshold,
        }
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RB={} RSI={}", self.rebound_threshold, self.rsi_threshold)
    }
}
