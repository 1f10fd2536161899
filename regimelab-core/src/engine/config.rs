//! Simulator configuration: costs, exit rules, regime weight table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{AssetRole, Regime};

/// Target weights per asset role for one regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleWeights {
    pub primary: f64,
    pub secondary: f64,
    pub satellite: f64,
}

impl RoleWeights {
    pub fn for_role(&self, role: AssetRole) -> f64 {
        match role {
            AssetRole::PrimaryAnchor => self.primary,
            AssetRole::SecondaryAnchor => self.secondary,
            AssetRole::Satellite => self.satellite,
        }
    }
}

/// Regime weight table. BEAR and UNKNOWN carry no weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeWeights {
    pub bull: RoleWeights,
    pub side: RoleWeights,
}

impl Default for RegimeWeights {
    fn default() -> Self {
        Self {
            bull: RoleWeights {
                primary: 0.4,
                secondary: 0.5,
                satellite: 0.1,
            },
            side: RoleWeights {
                primary: 0.6,
                secondary: 0.3,
                satellite: 0.1,
            },
        }
    }
}

impl RegimeWeights {
    pub fn for_regime(&self, regime: Regime) -> Option<&RoleWeights> {
        match regime {
            Regime::Bull => Some(&self.bull),
            Regime::Side => Some(&self.side),
            Regime::Bear | Regime::Unknown => None,
        }
    }
}

/// How the satellite weight is spread over the active basket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatelliteAllocation {
    /// Each basket member gets the full satellite weight.
    #[default]
    PerAsset,
    /// The satellite weight is split evenly across the basket.
    Aggregate,
}

/// Profit-protecting trailing stop on closes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopConfig {
    /// Gain over entry, in percent, that arms the stop.
    pub activation_pct: f64,
    /// Retracement from the peak close, in percent, that triggers the exit.
    pub callback_pct: f64,
}

impl Default for TrailingStopConfig {
    fn default() -> Self {
        Self {
            activation_pct: 25.0,
            callback_pct: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fee per unit of turnover.
    pub fee: f64,
    /// Per-asset slippage per unit of turnover.
    pub slippage: BTreeMap<String, f64>,
    pub default_slippage: f64,
    pub atr_multiplier: f64,
    /// Equity drawdown from peak that forces every asset flat.
    pub drawdown_limit: f64,
    /// Weight changes smaller than this are not traded.
    pub rebalance_threshold: f64,
    /// Exit when close < exit_ma_buffer × ma_long.
    pub exit_ma_buffer: f64,
    /// Exit when RSI drops below this.
    pub exit_rsi: f64,
    pub regime_weights: RegimeWeights,
    pub satellite_allocation: SatelliteAllocation,
    pub trailing_stop: Option<TrailingStopConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fee: 0.003,
            slippage: BTreeMap::from([("BTC".to_string(), 0.0003), ("ETH".to_string(), 0.0005)]),
            default_slippage: 0.0015,
            atr_multiplier: 3.0,
            drawdown_limit: 0.10,
            rebalance_threshold: 0.05,
            exit_ma_buffer: 0.99,
            exit_rsi: 45.0,
            regime_weights: RegimeWeights::default(),
            satellite_allocation: SatelliteAllocation::default(),
            trailing_stop: None,
        }
    }
}

impl SimConfig {
    /// Frictionless copy, for tests and what-if runs.
    pub fn frictionless(mut self) -> Self {
        self.fee = 0.0;
        self.default_slippage = 0.0;
        self.slippage.clear();
        self
    }

    pub fn slippage_for(&self, symbol: &str) -> f64 {
        self.slippage
            .get(symbol)
            .copied()
            .unwrap_or(self.default_slippage)
    }

    /// Total cost per unit of weight traded.
    pub fn cost_rate(&self, symbol: &str) -> f64 {
        self.fee + self.slippage_for(symbol)
    }
}
