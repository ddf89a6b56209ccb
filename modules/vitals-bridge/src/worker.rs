//! Background sender for the feedback bridge.
//!
//! Every interval: turns the readings received since the last tick into a
//! strength value and pushes it to the device, but only when it changed.

use crate::dglab::DgLabClient;
use crate::state::BridgeState;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub async fn run_worker(
    state: Arc<Mutex<BridgeState>>,
    dglab: DgLabClient,
    channel: String,
    interval: Duration,
) {
    log::info!(
        "[VITALS_BRIDGE] Background sender started (interval: {:?}, channel: {}, DG-LAB: {})",
        interval,
        channel,
        dglab.strength_url()
    );

    loop {
        tokio::time::sleep(interval).await;
        sender_tick(&state, &dglab, &channel, interval).await;
    }
}

/// One sender tick. Returns the strength that was delivered, if any.
pub async fn sender_tick(
    state: &Mutex<BridgeState>,
    dglab: &DgLabClient,
    channel: &str,
    interval: Duration,
) -> Option<u32> {
    let (strength, mode) = {
        let mut state = state.lock();
        let strength = state.next_strength(interval.as_secs_f64());
        if !state.needs_send(strength) {
            log::debug!(
                "[VITALS_BRIDGE] Strength {} hasn't changed since last send. Skipping.",
                strength
            );
            return None;
        }
        (strength, state.last_data_type())
    };

    log::info!(
        "[VITALS_BRIDGE] Strength changed to {} (Mode: {}). Sending update...",
        strength,
        mode
    );

    match dglab.set_strength(channel, strength).await {
        Ok(()) => {
            state.lock().mark_sent(strength);
            Some(strength)
        }
        Err(e) => {
            // Not marked as sent, so the next tick tries again with a fresh value
            log::error!("[VITALS_BRIDGE] {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Json;
    use serde_json::Value;
    use vitals_types::DataType;

    async fn fake_dglab() -> (String, tokio::sync::mpsc::Receiver<Value>) {
        let (tx, rx) = tokio::sync::mpsc::channel::<Value>(16);
        let app = axum::Router::new().route(
            "/control/strength",
            axum::routing::post(move |Json(body): Json<Value>| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(body).await;
                    Json(serde_json::json!({"status": "ok"}))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/control/strength", addr), rx)
    }

    #[tokio::test]
    async fn test_sends_only_on_change() {
        let (url, mut rx) = fake_dglab().await;
        let dglab = DgLabClient::new(&url);
        let state = Mutex::new(BridgeState::default());
        let interval = Duration::from_millis(200);

        // First tick always sends the idle strength
        assert_eq!(sender_tick(&state, &dglab, "a", interval).await, Some(0));
        assert_eq!(rx.recv().await.unwrap()["strength"], 0);

        // Unchanged: nothing sent
        assert_eq!(sender_tick(&state, &dglab, "a", interval).await, None);

        state.lock().record(DataType::Stamina, 5.0);
        assert_eq!(sender_tick(&state, &dglab, "a", interval).await, Some(10));
        let body = rx.recv().await.unwrap();
        assert_eq!(body["strength"], 10);
        assert_eq!(body["channel"], "a");
        assert_eq!(state.lock().last_sent_strength(), Some(10));
    }

    #[tokio::test]
    async fn test_failed_send_is_retried_next_tick() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dglab = DgLabClient::new(&format!("http://{}/control/strength", addr));
        let state = Mutex::new(BridgeState::default());
        let interval = Duration::from_millis(200);

        assert_eq!(sender_tick(&state, &dglab, "a", interval).await, None);
        assert_eq!(state.lock().last_sent_strength(), None);
        assert!(state.lock().needs_send(0));
    }
}
