//! Frame timing
//!
//! The engine never reads a clock itself. The host passes monotonic
//! timestamps in seconds and [`Time`] derives the per-frame delta from them.

/// Delta time and frame bookkeeping
#[derive(Debug, Clone, Default)]
pub struct Time {
    /// Timestamp of the previous tick, if any
    last: Option<f64>,
    /// Seconds between the two most recent ticks
    delta: f32,
    /// Seconds accumulated since `reset`
    elapsed: f64,
    /// Ticks since `reset`
    frame_count: u64,
}

impl Time {
    /// Create a clock that has not ticked yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start measuring from `now`
    pub fn reset(&mut self, now: f64) {
        *self = Self {
            last: Some(now),
            ..Self::default()
        };
    }

    /// Advance to `now` and return the delta in seconds.
    ///
    /// The first tick without a prior `reset` yields zero. Timestamps that go
    /// backwards are clamped to a zero delta.
    pub fn tick(&mut self, now: f64) -> f32 {
        let delta = match self.last {
            Some(last) if now > last => (now - last) as f32,
            _ => 0.0,
        };
        self.last = Some(now);
        self.delta = delta;
        self.elapsed += f64::from(delta);
        self.frame_count += 1;
        delta
    }

    /// Seconds covered by the last tick
    #[must_use]
    #[inline]
    pub fn delta_seconds(&self) -> f32 {
        self.delta
    }

    /// Seconds since `reset`
    #[must_use]
    #[inline]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    /// Ticks since `reset`
    #[must_use]
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
