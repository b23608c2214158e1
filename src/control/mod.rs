//! Setpoint reset logic: request aggregation, trim-and-respond, outdoor reset.

/// Ranked request counting with outlier exclusion.
pub mod request;
pub mod reset;
/// Bounded incremental setpoint controller.
pub mod trim_respond;

pub use request::{RequestAggregator, RequestSummary};
pub use reset::OutdoorReset;
pub use trim_respond::{Adjustment, ControlState, Direction, ResponsePolicy, TrimResponseController};
