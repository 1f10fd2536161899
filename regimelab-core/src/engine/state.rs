//! Per-asset position state owned by a single simulation run.

use std::collections::BTreeMap;

/// Symbol → weight. Only non-zero weights are stored.
pub type WeightMap = BTreeMap<String, f64>;

/// Mutable per-asset record. HOLDING iff `entry_price` is Some.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionState {
    pub weight: f64,
    pub entry_price: Option<f64>,
    /// Trailing stop armed.
    pub trailing_active: bool,
    /// Highest close since the trailing stop armed.
    pub trailing_peak: f64,
}

impl PositionState {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn is_holding(&self) -> bool {
        self.entry_price.is_some()
    }

    pub fn enter(&mut self, weight: f64, price: f64) {
        self.weight = weight;
        self.entry_price = Some(price);
        self.reset_trailing();
    }

    pub fn exit(&mut self) {
        self.weight = 0.0;
        self.entry_price = None;
        self.reset_trailing();
    }

    fn reset_trailing(&mut self) {
        self.trailing_active = false;
        self.trailing_peak = 0.0;
    }
}
