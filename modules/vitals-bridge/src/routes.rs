//! Axum route handlers for the feedback bridge.

use crate::state::{self, BridgeState};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use vitals_types::*;

pub struct AppState {
    pub bridge: Arc<Mutex<BridgeState>>,
    pub start_time: Instant,
}

pub fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/update_data", axum::routing::post(update_data))
        .route("/status", axum::routing::get(status))
        .with_state(state)
}

fn bad_request(msg: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(msg))).into_response()
}

// POST /update_data
pub async fn update_data(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        log::warn!("[VITALS_BRIDGE] Received non-JSON request");
        return bad_request("Request must be JSON");
    };

    let (data_type, value) = match state::parse_update(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("[VITALS_BRIDGE] Rejected update {}: {}", body, e);
            return bad_request(e);
        }
    };

    state.bridge.lock().record(data_type, value);

    (
        StatusCode::OK,
        Json(UpdateDataResponse {
            status: "received".to_string(),
            data_type: data_type.to_string(),
        }),
    )
        .into_response()
}

// GET /status
pub async fn status(State(state): State<Arc<AppState>>) -> (StatusCode, Json<BridgeStatus>) {
    let bridge = state.bridge.lock();
    (
        StatusCode::OK,
        Json(BridgeStatus {
            running: true,
            uptime_secs: state.start_time.elapsed().as_secs(),
            last_data_type: bridge.last_data_type(),
            current_health: bridge.health(),
            current_penalty: bridge.penalty().penalty(),
            stamina_at_zero: bridge.penalty().is_at_zero(),
            last_sent_strength: bridge.last_sent_strength(),
            last_sent_at: bridge.last_sent_at().map(|s| s.to_string()),
            buffered_readings: bridge.buffered_readings(),
        }),
    )
}
