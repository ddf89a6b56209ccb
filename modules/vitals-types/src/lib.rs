//! Shared types for the vitals sampler and the feedback bridge that receives its samples.

use serde::{Deserialize, Serialize};
use std::fmt;

// =====================================================
// Domain Types
// =====================================================

/// Label carried on the wire for a sampled value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Stamina,
    Health,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Stamina => "stamina",
            DataType::Health => "health",
        }
    }

    /// Parse a wire label, ignoring case. Returns None for anything unknown.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "stamina" => Some(DataType::Stamina),
            "health" => Some(DataType::Health),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which field of the player state the sampler reads.
///
/// Parsed from a free-form config string: `Health` in any case selects health,
/// everything else (including typos and empty strings) falls back to stamina.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataSource {
    #[default]
    Stamina,
    Health,
}

impl DataSource {
    pub fn from_config(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("health") {
            DataSource::Health
        } else {
            DataSource::Stamina
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            DataSource::Stamina => DataType::Stamina,
            DataSource::Health => DataType::Health,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Stamina => write!(f, "Stamina"),
            DataSource::Health => write!(f, "Health"),
        }
    }
}

/// One reading taken at a gate-pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub data_type: DataType,
    pub value: f64,
    /// Host clock time (seconds) of the tick that produced the sample
    pub taken_at: f64,
}

/// Body of `POST /update_data`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalsPayload {
    #[serde(rename = "dataType")]
    pub data_type: DataType,
    pub value: f64,
}

/// Result of one delivery attempt. Only logged and counted, never retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(status_code: u16) -> Self {
        Self {
            success: true,
            status_code: Some(status_code),
            error: None,
        }
    }

    pub fn rejected(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: Some(status_code),
            error: Some(body.into()),
        }
    }

    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: None,
            error: Some(error.into()),
        }
    }
}

// =====================================================
// Bridge Response Types
// =====================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDataResponse {
    pub status: String,
    #[serde(rename = "dataType")]
    pub data_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub last_data_type: DataType,
    pub current_health: f64,
    pub current_penalty: f64,
    pub stamina_at_zero: bool,
    pub last_sent_strength: Option<u32>,
    pub last_sent_at: Option<String>,
    pub buffered_readings: usize,
}
