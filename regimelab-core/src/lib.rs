//! RegimeLab Core: domain types, indicators, regime, baskets, simulation.
//!
//! This crate contains the strategy engine:
//! - Domain types (bars, aligned market data, regimes, parameter sets)
//! - Per-asset indicator builder with a look-ahead guard
//! - Satellite basket scoring and the per-date basket schedule
//! - Path-dependent portfolio simulator with costs and stops
//!
//! Nothing here does I/O; loading, optimization and reporting live in
//! `regimelab-runner`.

pub mod basket;
pub mod domain;
pub mod engine;
pub mod indicators;
