use std::time::{Duration, Instant};

/// Frame clock producing the per-tick time step fed to animation updates.
///
/// Use [`tick`](Self::tick) for wall-clock frames, or
/// [`advance`](Self::advance) to step by a fixed amount (tests, replays,
/// headless tools).
pub struct FrameClock {
    start_time: Instant,
    last_update: Instant,
    /// Time since last tick
    pub delta: Duration,
    /// Total elapsed time since creation
    pub elapsed: Duration,
    /// Total number of ticks
    pub frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Creates a new clock starting from now.
    #[must_use]
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_update: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Samples the wall clock and returns the step in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.delta = now - self.last_update;
        self.elapsed = now - self.start_time;
        self.last_update = now;
        self.frame_count += 1;
        self.dt_seconds()
    }

    /// Steps the clock by a fixed amount and returns it in seconds.
    pub fn advance(&mut self, step: Duration) -> f32 {
        self.delta = step;
        self.elapsed += step;
        self.last_update += step;
        self.frame_count += 1;
        self.dt_seconds()
    }

    #[must_use]
    pub fn dt_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}
