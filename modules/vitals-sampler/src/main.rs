//! Vitals Sampler: runs the sampling pipeline against a simulated player.
//!
//! Posts samples to VITALS_DESTINATION_URL (default: http://127.0.0.1:17553/update_data).
//! Set VITALS_CONFIG_FILE to a TOML file to enable live config reload.

use std::path::PathBuf;
use std::time::Duration;
use vitals_sampler::config::{self, ConfigHandle, SamplerConfig};
use vitals_sampler::delivery::{self, DeliveryWorker};
use vitals_sampler::host::{self, SimulatedPlayer};
use vitals_sampler::sampler::Sampler;

const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(1);
const STATS_LOG_INTERVAL: Duration = Duration::from_secs(5);
const SPAWN_DELAY_SECS: f32 = 1.0;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let base = SamplerConfig::from_env();
    let config_file = std::env::var("VITALS_CONFIG_FILE").ok().map(PathBuf::from);

    let initial = match &config_file {
        Some(path) => base.with_file(path).unwrap_or_else(|e| {
            log::warn!("[VITALS_CONFIG] {}; using environment config", e);
            base.clone()
        }),
        None => base.clone(),
    };

    log::info!("[VITALS_CONFIG] Destination URL set to: {}", initial.destination_url);
    log::info!("[VITALS_CONFIG] Send interval set to: {} seconds", initial.interval_seconds);
    log::info!("[VITALS_CONFIG] Data source set to: {}", initial.data_source);

    let client = match delivery::build_client(initial.delivery_timeout()) {
        Ok(c) => c,
        Err(e) => {
            log::error!("[VITALS_DELIVERY] Failed to create HTTP client: {}", e);
            return;
        }
    };

    let handle = ConfigHandle::new(initial.clone());
    if let Some(path) = config_file {
        config::spawn_file_watcher(handle.clone(), base, path, CONFIG_POLL_INTERVAL);
    }

    let worker = DeliveryWorker::spawn(client, initial.queue_capacity, initial.max_in_flight);
    let sampler = Sampler::new(handle.clone(), worker);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("[VITALS_SAMPLER] Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let sampler = host::run_host_loop(
        sampler,
        SimulatedPlayer::new(SPAWN_DELAY_SECS),
        handle,
        STATS_LOG_INTERVAL,
        shutdown,
    )
    .await;

    let stats = sampler.worker().stats();
    log::info!(
        "[VITALS_SAMPLER] Shutting down with {} deliveries still pending",
        stats.pending()
    );
}
