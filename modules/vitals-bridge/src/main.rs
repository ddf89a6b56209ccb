//! Vitals Bridge: standalone binary that receives vitals samples and drives the DG-LAB device.
//!
//! Receives samples on POST /update_data and pushes strength changes to the DG-LAB API.
//! Default: http://0.0.0.0:17553/

mod dglab;
mod routes;
mod state;
mod strength;
mod worker;

use parking_lot::Mutex;
use routes::AppState;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let port: u16 = std::env::var("BRIDGE_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(17553);

    let dglab = match std::env::var("DGLAB_STRENGTH_URL") {
        Ok(url) => dglab::DgLabClient::new(&url),
        Err(_) => dglab::DgLabClient::default_local(),
    };

    let send_interval_secs: f64 = std::env::var("BRIDGE_SEND_INTERVAL")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|v: &f64| v.is_finite() && *v > 0.0)
        .unwrap_or(0.2);

    let channel = std::env::var("BRIDGE_TARGET_CHANNEL").unwrap_or_else(|_| "a".to_string());

    let bridge = Arc::new(Mutex::new(state::BridgeState::default()));

    let worker_bridge = bridge.clone();
    let interval = Duration::from_secs_f64(send_interval_secs);
    tokio::spawn(async move {
        worker::run_worker(worker_bridge, dglab, channel, interval).await;
    });

    let state = Arc::new(AppState {
        bridge,
        start_time: Instant::now(),
    });

    let cors = tower_http::cors::CorsLayer::permissive();
    let app = routes::router(state).layer(cors);

    let addr = format!("0.0.0.0:{}", port);
    log::info!("[VITALS_BRIDGE] Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
