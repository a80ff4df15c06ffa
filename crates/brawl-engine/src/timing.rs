//! Fixed-step clock for the simulation loop.
//!
//! Real frame time is fed in, whole simulation steps come out. The
//! remainder carries over so the match advances at the configured rate
//! no matter how irregular the caller is.

/// Frame clock.
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Seconds per simulation step
    fixed_dt: f32,
    /// Largest real delta accepted in one call
    max_dt: f32,
    /// Time not yet consumed by a step
    accumulator: f32,
    /// Simulated time since start, excluding pauses
    simulated: f32,
    /// Steps handed out since start
    steps: u64,
    paused: bool,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FrameClock {
    /// Most steps returned from one `advance` call.
    pub const MAX_STEPS: u32 = 10;

    /// Create a clock stepping `tick_rate` times per second.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            fixed_dt: 1.0 / tick_rate as f32,
            max_dt: 0.1,
            accumulator: 0.0,
            simulated: 0.0,
            steps: 0,
            paused: false,
        }
    }

    /// Seconds per step.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Feeds real elapsed time and returns how many steps to run.
    ///
    /// Negative and non-finite deltas count as zero. While paused
    /// nothing accumulates.
    pub fn advance(&mut self, real_dt: f32) -> u32 {
        if self.paused {
            return 0;
        }
        let dt = if real_dt.is_finite() { real_dt.clamp(0.0, self.max_dt) } else { 0.0 };
        self.accumulator += dt;

        let mut count = 0;
        while self.accumulator >= self.fixed_dt && count < Self::MAX_STEPS {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind: drop the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        self.steps += u64::from(count);
        self.simulated += count as f32 * self.fixed_dt;
        count
    }

    /// Stops accumulating time.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes accumulating time. Any partial step is discarded.
    pub fn resume(&mut self) {
        self.paused = false;
        self.accumulator = 0.0;
    }

    /// Whether the clock is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Simulated seconds handed out so far.
    #[must_use]
    pub fn simulated(&self) -> f32 {
        self.simulated
    }

    /// Steps handed out so far.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_steps() {
        let mut clock = FrameClock::new(60);
        assert_eq!(clock.advance(1.0 / 30.0 + 0.001), 2);
        assert_eq!(clock.steps(), 2);
    }

    #[test]
    fn test_remainder_carries_over() {
        let mut clock = FrameClock::new(10);
        assert_eq!(clock.advance(0.06), 0);
        assert_eq!(clock.advance(0.06), 1);
    }

    #[test]
    fn test_large_delta_is_clamped() {
        let mut clock = FrameClock::new(60);
        let steps = clock.advance(5.0);
        assert!(steps <= 6, "got {steps}");
        assert_eq!(clock.advance(f32::NAN), 0);
        assert_eq!(clock.advance(-1.0), 0);
    }

    #[test]
    fn test_pause_stops_time() {
        let mut clock = FrameClock::new(60);
        clock.pause();
        assert!(clock.is_paused());
        assert_eq!(clock.advance(0.05), 0);
        clock.resume();
        assert!(clock.advance(0.05) > 0);
    }
}
