//! In-memory state shared by the HTTP handlers and the background sender.

use crate::strength::{self, MAX_HEALTH, MAX_STAMINA, PenaltyTracker};
use serde_json::Value;
use std::collections::VecDeque;
use vitals_types::DataType;

/// Upper bound on buffered stamina readings between two sender ticks
const MAX_BUFFERED_READINGS: usize = 4096;

#[derive(Debug, Clone)]
pub struct BridgeState {
    stamina_buffer: VecDeque<f64>,
    health: f64,
    last_data_type: DataType,
    penalty: PenaltyTracker,
    last_sent_strength: Option<u32>,
    last_sent_at: Option<String>,
}

impl Default for BridgeState {
    fn default() -> Self {
        Self {
            stamina_buffer: VecDeque::new(),
            health: MAX_HEALTH,
            last_data_type: DataType::Stamina,
            penalty: PenaltyTracker::default(),
            last_sent_strength: None,
            last_sent_at: None,
        }
    }
}

impl BridgeState {
    /// Apply one validated reading from the sampler.
    pub fn record(&mut self, data_type: DataType, value: f64) {
        match data_type {
            DataType::Stamina => {
                self.penalty.observe(value);
                if self.stamina_buffer.len() >= MAX_BUFFERED_READINGS {
                    self.stamina_buffer.pop_front();
                }
                self.stamina_buffer.push_back(value);
            }
            DataType::Health => {
                self.health = value;
                log::debug!("[VITALS_BRIDGE] Health updated to: {:.2}", value);
            }
        }
        self.last_data_type = data_type;
    }

    /// Compute the strength for the interval that just ended.
    ///
    /// Drains the stamina buffer in every mode so stale readings never leak
    /// into a later stamina interval.
    pub fn next_strength(&mut self, elapsed_secs: f64) -> u32 {
        let avg_stamina = if self.stamina_buffer.is_empty() {
            MAX_STAMINA
        } else {
            self.stamina_buffer.iter().sum::<f64>() / self.stamina_buffer.len() as f64
        };
        self.stamina_buffer.clear();

        match self.last_data_type {
            DataType::Stamina => {
                self.penalty.decay(elapsed_secs);
                let strength = strength::stamina_strength(avg_stamina, self.penalty.penalty());
                log::debug!(
                    "[VITALS_BRIDGE] Stamina avg {:.2}, penalty {:.2} -> strength {}",
                    avg_stamina,
                    self.penalty.penalty(),
                    strength
                );
                strength
            }
            DataType::Health => {
                let strength = strength::health_strength(self.health);
                log::debug!(
                    "[VITALS_BRIDGE] Health {:.2} -> strength {}",
                    self.health,
                    strength
                );
                strength
            }
        }
    }

    pub fn needs_send(&self, strength: u32) -> bool {
        self.last_sent_strength != Some(strength)
    }

    pub fn mark_sent(&mut self, strength: u32) {
        self.last_sent_strength = Some(strength);
        self.last_sent_at = Some(chrono::Utc::now().to_rfc3339());
    }

    pub fn last_data_type(&self) -> DataType {
        self.last_data_type
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn penalty(&self) -> &PenaltyTracker {
        &self.penalty
    }

    pub fn last_sent_strength(&self) -> Option<u32> {
        self.last_sent_strength
    }

    pub fn last_sent_at(&self) -> Option<&str> {
        self.last_sent_at.as_deref()
    }

    pub fn buffered_readings(&self) -> usize {
        self.stamina_buffer.len()
    }
}

/// Validate a `POST /update_data` body.
///
/// The value is checked before the label, so a bad value is reported even
/// when the label is also unknown.
pub fn parse_update(body: &Value) -> Result<(DataType, f64), String> {
    let (Some(raw_type), Some(raw_value)) = (body.get("dataType"), body.get("value")) else {
        return Err("Missing 'dataType' or 'value' field".to_string());
    };

    let label = match raw_type {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    };

    let value = match raw_value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| "Invalid value type".to_string())?;

    let data_type = DataType::from_label(&label).ok_or_else(|| format!("Unknown dataType: {}", label))?;
    Ok((data_type, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strength::PENALTY_INCREMENT_ON_ZERO;
    use serde_json::json;

    #[test]
    fn test_parse_update_valid() {
        assert_eq!(
            parse_update(&json!({"dataType": "stamina", "value": 42.5})).unwrap(),
            (DataType::Stamina, 42.5)
        );
        assert_eq!(
            parse_update(&json!({"dataType": "Health", "value": "80"})).unwrap(),
            (DataType::Health, 80.0)
        );
    }

    #[test]
    fn test_parse_update_errors() {
        assert_eq!(
            parse_update(&json!({"value": 1.0})).unwrap_err(),
            "Missing 'dataType' or 'value' field"
        );
        assert_eq!(
            parse_update(&json!({"dataType": "stamina", "value": [1]})).unwrap_err(),
            "Invalid value type"
        );
        assert_eq!(
            parse_update(&json!({"dataType": "mana", "value": "abc"})).unwrap_err(),
            "Invalid value type"
        );
        assert_eq!(
            parse_update(&json!({"dataType": "Mana", "value": 3})).unwrap_err(),
            "Unknown dataType: mana"
        );
    }

    #[test]
    fn test_initial_strength_is_zero() {
        let mut state = BridgeState::default();
        assert_eq!(state.next_strength(0.2), 0);
        assert!(state.needs_send(0));
        state.mark_sent(0);
        assert!(!state.needs_send(0));
        assert!(state.last_sent_at().is_some());
    }

    #[test]
    fn test_stamina_average_and_drain() {
        let mut state = BridgeState::default();
        state.record(DataType::Stamina, 4.0);
        state.record(DataType::Stamina, 6.0);
        assert_eq!(state.buffered_readings(), 2);

        // avg 5 -> (10 - 5) * 2
        assert_eq!(state.next_strength(0.2), 10);
        assert_eq!(state.buffered_readings(), 0);
        // Empty buffer reads as full stamina
        assert_eq!(state.next_strength(0.2), 0);
    }

    #[test]
    fn test_zero_stamina_applies_penalty() {
        let mut state = BridgeState::default();
        state.record(DataType::Stamina, 0.0);
        assert!(state.penalty().is_at_zero());
        let expected = (20.0 * (1.0 + PENALTY_INCREMENT_ON_ZERO)).round_ties_even() as u32;
        assert_eq!(state.next_strength(0.2), expected);
    }

    #[test]
    fn test_health_mode_follows_last_type() {
        let mut state = BridgeState::default();
        state.record(DataType::Stamina, 0.0);
        state.record(DataType::Health, 75.0);
        assert_eq!(state.last_data_type(), DataType::Health);
        assert_eq!(state.health(), 75.0);
        // Health mode ignores the stamina penalty
        assert_eq!(state.next_strength(0.2), 50);
        assert_eq!(state.buffered_readings(), 0);
    }

    #[test]
    fn test_buffer_is_bounded() {
        let mut state = BridgeState::default();
        for _ in 0..(MAX_BUFFERED_READINGS + 10) {
            state.record(DataType::Stamina, 5.0);
        }
        assert_eq!(state.buffered_readings(), MAX_BUFFERED_READINGS);
    }

    #[test]
    fn test_full_buffer_evicts_oldest_reading() {
        let mut state = BridgeState::default();
        state.record(DataType::Stamina, 1000.0);
        for _ in 0..MAX_BUFFERED_READINGS {
            state.record(DataType::Stamina, 4.0);
        }
        assert_eq!(state.buffered_readings(), MAX_BUFFERED_READINGS);
        // The 1000.0 reading is gone: avg 4 -> (10 - 4) * 2
        assert_eq!(state.next_strength(0.2), 12);
    }
}
