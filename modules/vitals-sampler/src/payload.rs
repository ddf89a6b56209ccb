//! JSON wire encoding for samples.

use vitals_types::{DataType, VitalsPayload};

/// Encode `{"dataType": ..., "value": ...}`.
///
/// Number formatting goes through serde_json, which never consults the host
/// locale, so the decimal separator is always `.`.
pub fn encode(data_type: DataType, value: f64) -> Vec<u8> {
    let payload = VitalsPayload { data_type, value };
    // Serializing a plain struct of an enum and a finite f64 cannot fail
    serde_json::to_vec(&payload).unwrap_or_default()
}

pub fn decode(bytes: &[u8]) -> Result<VitalsPayload, String> {
    serde_json::from_slice(bytes).map_err(|e| format!("Invalid payload: {}", e))
}
