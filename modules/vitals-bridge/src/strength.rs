//! Mapping from received vitals to device output strength.

pub const MAX_STAMINA: f64 = 10.0;
pub const MAX_HEALTH: f64 = 100.0;
/// Strength units per missing point of stamina or health
pub const STRENGTH_MULTIPLIER: f64 = 2.0;
pub const MAX_OUTPUT_STRENGTH: f64 = 60.0;
/// Added to the penalty each time stamina hits zero
pub const PENALTY_INCREMENT_ON_ZERO: f64 = 0.4;
pub const PENALTY_DECAY_PER_SECOND: f64 = 0.0001;
/// Stamina at or below this counts as zero
pub const STAMINA_ZERO_THRESHOLD: f64 = 0.01;

fn clamp_strength(raw: f64) -> u32 {
    // Ties round to even
    raw.clamp(0.0, MAX_OUTPUT_STRENGTH).round_ties_even() as u32
}

/// Strength for an average stamina reading, scaled up by the exhaustion penalty.
pub fn stamina_strength(avg_stamina: f64, penalty: f64) -> u32 {
    let base = (MAX_STAMINA - avg_stamina).max(0.0) * STRENGTH_MULTIPLIER;
    let multiplier = if penalty > 0.0 { 1.0 + penalty } else { 1.0 };
    clamp_strength(base * multiplier)
}

pub fn health_strength(health: f64) -> u32 {
    clamp_strength((MAX_HEALTH - health).max(0.0) * STRENGTH_MULTIPLIER)
}

/// Penalty that builds up every time stamina is fully drained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PenaltyTracker {
    penalty: f64,
    at_zero: bool,
}

impl PenaltyTracker {
    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    pub fn is_at_zero(&self) -> bool {
        self.at_zero
    }

    /// Feed a raw stamina reading. Only the transition into zero adds penalty.
    pub fn observe(&mut self, stamina: f64) {
        if stamina <= STAMINA_ZERO_THRESHOLD && !self.at_zero {
            self.at_zero = true;
            self.penalty += PENALTY_INCREMENT_ON_ZERO;
            log::info!(
                "[VITALS_BRIDGE] Stamina dropped to zero. Penalty incremented by {}. New penalty: {:.2}",
                PENALTY_INCREMENT_ON_ZERO,
                self.penalty
            );
        } else if stamina > STAMINA_ZERO_THRESHOLD && self.at_zero {
            self.at_zero = false;
            log::info!(
                "[VITALS_BRIDGE] Stamina recovered. Current penalty remains at {:.2}",
                self.penalty
            );
        }
    }

    /// Bleed off penalty for `elapsed_secs` of time spent above zero.
    pub fn decay(&mut self, elapsed_secs: f64) {
        if self.at_zero || self.penalty <= 0.0 {
            return;
        }
        self.penalty = (self.penalty - PENALTY_DECAY_PER_SECOND * elapsed_secs).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamina_strength_scale() {
        assert_eq!(stamina_strength(MAX_STAMINA, 0.0), 0);
        assert_eq!(stamina_strength(5.0, 0.0), 10);
        assert_eq!(stamina_strength(0.0, 0.0), 20);
        // Above max never goes negative
        assert_eq!(stamina_strength(12.0, 0.0), 0);
    }

    #[test]
    fn test_penalty_scales_stamina_strength() {
        assert_eq!(stamina_strength(0.0, 0.5), 30);
        // Clamped to the device maximum
        assert_eq!(stamina_strength(0.0, 4.0), 60);
    }

    #[test]
    fn test_health_strength() {
        assert_eq!(health_strength(100.0), 0);
        assert_eq!(health_strength(90.0), 20);
        assert_eq!(health_strength(0.0), 60);
    }

    #[test]
    fn test_rounding_ties_to_even() {
        // 10 - 8.75 = 1.25 -> 2.5 strength
        assert_eq!(stamina_strength(8.75, 0.0), 2);
        // 10 - 8.25 = 1.75 -> 3.5 strength
        assert_eq!(stamina_strength(8.25, 0.0), 4);
    }

    #[test]
    fn test_penalty_only_on_transition() {
        let mut tracker = PenaltyTracker::default();
        tracker.observe(5.0);
        assert_eq!(tracker.penalty(), 0.0);

        tracker.observe(0.0);
        tracker.observe(0.005);
        assert!(tracker.is_at_zero());
        assert!((tracker.penalty() - PENALTY_INCREMENT_ON_ZERO).abs() < 1e-9);

        tracker.observe(3.0);
        assert!(!tracker.is_at_zero());
        tracker.observe(0.0);
        assert!((tracker.penalty() - 2.0 * PENALTY_INCREMENT_ON_ZERO).abs() < 1e-9);
    }

    #[test]
    fn test_decay_paused_at_zero() {
        let mut tracker = PenaltyTracker::default();
        tracker.observe(0.0);
        let before = tracker.penalty();
        tracker.decay(100.0);
        assert_eq!(tracker.penalty(), before);

        tracker.observe(1.0);
        tracker.decay(1000.0);
        assert!((tracker.penalty() - (before - 0.1)).abs() < 1e-9);

        tracker.decay(1.0e9);
        assert_eq!(tracker.penalty(), 0.0);
    }
}
