/// Interval counter.
pub mod clock;
/// Actuator command vocabulary.
pub mod command;
pub mod engine;
pub mod kpi;
/// Occupancy schedule gate.
pub mod schedule;
pub mod scheduler;
pub mod types;
