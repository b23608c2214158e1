//! Trim-and-respond setpoint reset and optimal-start estimation for
//! building automation.
//!
//! The control core ([`control`], [`optimal_start`]) is pure and never
//! reads sensors or clocks on its own; inputs arrive through
//! [`sources::SampleSource`] and the [`sim`] engine drives it once per
//! control interval.

/// REST API over a finished run (requires the `api` feature).
#[cfg(feature = "api")]
pub mod api;
pub mod config;
/// Request aggregation, trim-and-respond, and outdoor-air reset.
pub mod control;
pub mod error;
/// CSV export and history loading.
pub mod io;
pub mod logging;
pub mod optimal_start;
pub mod runner;
/// Engine, scheduler, occupancy gate, and KPI modules.
pub mod sim;
pub mod sources;
