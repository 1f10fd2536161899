//! Portfolio simulation engine.
//!
//! The simulator consumes aligned market data (indicators precomputed) and
//! the basket schedule, then runs the daily weight loop for one parameter
//! set over one date window.

pub mod config;
pub mod result;
pub mod simulator;
pub mod state;

pub use config::{
    RegimeWeights, RoleWeights, SatelliteAllocation, SimConfig, TrailingStopConfig,
};
pub use result::{EventKind, ExitReason, PositionEvent, SimulationResult};
pub use simulator::{Simulator, WEIGHT_EPSILON};
pub use state::{PositionState, WeightMap};
