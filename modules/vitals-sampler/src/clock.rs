//! Interval gate deciding which host ticks turn into samples.

/// True when at least `interval_secs` have passed since `last_sample_at`.
/// The boundary is inclusive.
pub fn should_sample(now: f64, last_sample_at: f64, interval_secs: f64) -> bool {
    now - last_sample_at >= interval_secs
}

/// Holds the time of the last gate-pass.
///
/// Owned by the single thread that drives ticks, so there is no locking.
#[derive(Debug, Default, Clone)]
pub struct SamplerClock {
    last_sample_at: Option<f64>,
}

impl SamplerClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the gate and, when it opens, move the baseline to `now`.
    ///
    /// The baseline moves whether or not the caller's read then succeeds,
    /// so a failing read is attempted once per interval rather than every tick.
    /// Before the first pass there is no baseline and the gate is open.
    pub fn try_pass(&mut self, now: f64, interval_secs: f64) -> bool {
        let open = match self.last_sample_at {
            None => true,
            Some(last) => should_sample(now, last, interval_secs),
        };
        if open {
            self.last_sample_at = Some(now);
        }
        open
    }

    pub fn last_sample_at(&self) -> Option<f64> {
        self.last_sample_at
    }
}
