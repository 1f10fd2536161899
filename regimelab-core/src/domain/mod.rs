//! Domain types for RegimeLab

pub mod bar;
pub mod params;
pub mod regime;
pub mod series;

pub use bar::{Bar, RawBar};
pub use params::ParameterSet;
pub use regime::{classify_values, Regime};
pub use series::{AssetRole, AssetSeries, DataError, DateWindow, MarketData};

/// Symbol type alias
pub type Symbol = String;
