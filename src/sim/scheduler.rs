//! Periodic execution of control tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::clock::Clock;

/// Work performed once per control interval.
///
/// Each implementor owns its state exclusively; the scheduler never shares
/// one task's state with another.
pub trait PeriodicTask {
    type Output;
    type Error: std::fmt::Display;

    /// Executes interval `t`.
    fn tick(&mut self, t: usize) -> Result<Self::Output, Self::Error>;
}

/// Cooperative cancellation flag shared between a scheduler and its owner.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the loop stop before its next tick.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a [`PeriodicTask`] serially for a fixed number of intervals.
///
/// A failed tick is logged and skipped; the loop carries on with the next
/// interval.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bas_ctl::sim::scheduler::{PeriodicTask, Scheduler, StopToken};
///
/// struct Counter(u32);
///
/// impl PeriodicTask for Counter {
///     type Output = u32;
///     type Error = String;
///
///     fn tick(&mut self, _t: usize) -> Result<u32, String> {
///         self.0 += 1;
///         Ok(self.0)
///     }
/// }
///
/// let scheduler = Scheduler::new(Duration::from_secs(300));
/// let out = scheduler.run(&mut Counter(0), 3, &StopToken::new());
/// assert_eq!(out, vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    period: Duration,
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs `ticks` intervals back-to-back.
    ///
    /// Returns the outputs of every successful tick.
    pub fn run<T: PeriodicTask>(&self, task: &mut T, ticks: usize, stop: &StopToken) -> Vec<T::Output> {
        self.drive(task, ticks, stop, false)
    }

    /// Runs `ticks` intervals, sleeping one period between them.
    pub fn run_paced<T: PeriodicTask>(
        &self,
        task: &mut T,
        ticks: usize,
        stop: &StopToken,
    ) -> Vec<T::Output> {
        self.drive(task, ticks, stop, true)
    }

    fn drive<T: PeriodicTask>(
        &self,
        task: &mut T,
        ticks: usize,
        stop: &StopToken,
        paced: bool,
    ) -> Vec<T::Output> {
        let mut clock = Clock::new(ticks);
        let mut outputs = Vec::with_capacity(ticks);

        while let Some(t) = clock.tick() {
            if stop.is_stopped() {
                info!(tick = t, "scheduler stopped");
                break;
            }
            if paced && t > 0 {
                thread::sleep(self.period);
            }
            match task.tick(t) {
                Ok(out) => outputs.push(out),
                Err(e) => warn!(tick = t, error = %e, "tick failed"),
            }
        }
        outputs
    }
}
