use std::time::Instant;

/// Frame timer handing out clamped `dt` values to the frame driver.
///
/// A stalled frame (debugger break, window drag) would otherwise produce one
/// huge step; the clamp bounds the simulation error of any single update.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    max_step: f32,
}

impl FrameClock {
    /// Default upper bound on `dt`, in seconds.
    pub const DEFAULT_MAX_STEP: f32 = 0.05;

    pub fn new(max_step: f32) -> Self {
        Self::starting_at(Instant::now(), max_step)
    }

    pub fn starting_at(start: Instant, max_step: f32) -> Self {
        Self {
            last: start,
            max_step,
        }
    }

    pub fn max_step(&self) -> f32 {
        self.max_step
    }

    /// Seconds since the previous tick, clamped to `max_step`.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        elapsed.as_secs_f32().min(self.max_step)
    }

    /// Restart timing from `now` without producing a step.
    pub fn reset_at(&mut self, now: Instant) {
        self.last = now;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_STEP)
    }
}
