/// Counts control intervals up to a fixed total.
///
/// # Examples
///
/// ```
/// use bas_ctl::sim::clock::Clock;
///
/// let mut clock = Clock::new(3);
/// let mut ticks = Vec::new();
///
/// clock.run(|t| ticks.push(t));
/// assert_eq!(ticks, vec![0, 1, 2]);
/// assert!(clock.is_finished());
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    current: usize,
    total: usize,
}

impl Clock {
    /// Creates a clock that will yield `total` ticks.
    pub fn new(total: usize) -> Self {
        Self { current: 0, total }
    }

    /// Advances the clock by one interval.
    ///
    /// # Returns
    ///
    /// * `Some(t)` - The interval index (starting from 0) before advancing
    /// * `None` - If every interval has been consumed
    pub fn tick(&mut self) -> Option<usize> {
        if self.current < self.total {
            let t = self.current;
            self.current += 1;
            Some(t)
        } else {
            None
        }
    }

    /// Calls `f` for every remaining interval.
    pub fn run(&mut self, mut f: impl FnMut(usize)) {
        while let Some(t) = self.tick() {
            f(t);
        }
    }

    /// Number of ticks already handed out.
    pub fn elapsed(&self) -> usize {
        self.current
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.total
    }
}
