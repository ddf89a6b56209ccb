//! Picks the configured field out of the host's player state.

use std::fmt;
use vitals_types::{DataSource, DataType};

/// Read-only view of the player's vitals at the instant of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameStateSnapshot {
    pub stamina: f32,
    pub health: f32,
}

/// Typed accessor the host implements to expose its player state.
///
/// Returns None while the player entity is not constructed yet or after it
/// has been torn down.
pub trait GameStateSource {
    fn snapshot(&self) -> Option<GameStateSnapshot>;
}

impl<F> GameStateSource for F
where
    F: Fn() -> Option<GameStateSnapshot>,
{
    fn snapshot(&self) -> Option<GameStateSnapshot> {
        self()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectError {
    /// The host had no player state to read on this tick
    FieldUnavailable(String),
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectError::FieldUnavailable(detail) => write!(f, "Field unavailable: {}", detail),
        }
    }
}

impl std::error::Error for SelectError {}

/// Read the value selected by `data_source` from the snapshot.
///
/// `data_source` is the raw config string. See [`DataSource::from_config`] for
/// the fallback rules.
pub fn select(
    snapshot: Option<&GameStateSnapshot>,
    data_source: &str,
) -> Result<(f64, DataType), SelectError> {
    let snapshot = snapshot
        .ok_or_else(|| SelectError::FieldUnavailable("player state is not available".to_string()))?;

    let source = DataSource::from_config(data_source);
    let value = match source {
        DataSource::Health => snapshot.health,
        DataSource::Stamina => snapshot.stamina,
    };

    if !value.is_finite() {
        return Err(SelectError::FieldUnavailable(format!(
            "{} is not a finite number ({})",
            source.data_type(),
            value
        )));
    }

    Ok((widen(value), source.data_type()))
}

/// Widen through the shortest decimal that reads back as the same f32, so
/// 7.3 stays 7.3 instead of 7.300000190734863.
fn widen(value: f32) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(value as f64)
}
