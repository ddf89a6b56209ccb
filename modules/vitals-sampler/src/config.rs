//! Sampler configuration: environment defaults, optional TOML file, live reload.
//!
//! The active config lives behind a [`ConfigHandle`] that the sampler reads on
//! every tick, so edits to the config file take effect without a restart.

use parking_lot::RwLock;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;

pub const DEFAULT_DESTINATION_URL: &str = "http://127.0.0.1:17553/update_data";
pub const DEFAULT_INTERVAL_SECS: f64 = 0.1;
pub const DEFAULT_DATA_SOURCE: &str = "Stamina";
pub const DEFAULT_DELIVERY_TIMEOUT_SECS: f64 = 2.0;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;
pub const DEFAULT_TICK_RATE_HZ: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub destination_url: String,
    pub interval_seconds: f64,
    /// Raw data source string, parsed at read time with stamina fallback
    pub data_source: String,
    pub delivery_timeout_secs: f64,
    pub max_in_flight: usize,
    pub queue_capacity: usize,
    pub tick_rate_hz: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            destination_url: DEFAULT_DESTINATION_URL.to_string(),
            interval_seconds: DEFAULT_INTERVAL_SECS,
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            delivery_timeout_secs: DEFAULT_DELIVERY_TIMEOUT_SECS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
        }
    }
}

/// On-disk layout. Every key is optional; missing keys keep the base value.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    general: GeneralSection,
    #[serde(default)]
    delivery: DeliverySection,
    #[serde(default)]
    host: HostSection,
}

#[derive(Debug, Default, Deserialize)]
struct GeneralSection {
    destination_url: Option<String>,
    send_interval_seconds: Option<f64>,
    data_source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DeliverySection {
    timeout_secs: Option<f64>,
    max_in_flight: Option<usize>,
    queue_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct HostSection {
    tick_rate_hz: Option<f64>,
}

impl SamplerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup, so tests don't have to touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).map(|s| s.trim().to_string());

        let config = Self {
            destination_url: parsed("VITALS_DESTINATION_URL")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.destination_url),
            interval_seconds: parsed("VITALS_INTERVAL_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.interval_seconds),
            data_source: parsed("VITALS_DATA_SOURCE").unwrap_or(defaults.data_source),
            delivery_timeout_secs: parsed("VITALS_DELIVERY_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.delivery_timeout_secs),
            max_in_flight: parsed("VITALS_MAX_IN_FLIGHT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_in_flight),
            queue_capacity: parsed("VITALS_QUEUE_CAPACITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.queue_capacity),
            tick_rate_hz: parsed("VITALS_TICK_RATE_HZ")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.tick_rate_hz),
        };
        config.validated()
    }

    /// Overlay a TOML document on top of `self`.
    pub fn with_toml(&self, text: &str) -> Result<Self, String> {
        let file: FileConfig =
            toml::from_str(text).map_err(|e| format!("Invalid config file: {}", e))?;

        let mut config = self.clone();
        if let Some(url) = file.general.destination_url {
            config.destination_url = url;
        }
        if let Some(interval) = file.general.send_interval_seconds {
            config.interval_seconds = interval;
        }
        if let Some(source) = file.general.data_source {
            config.data_source = source;
        }
        if let Some(timeout) = file.delivery.timeout_secs {
            config.delivery_timeout_secs = timeout;
        }
        if let Some(n) = file.delivery.max_in_flight {
            config.max_in_flight = n;
        }
        if let Some(n) = file.delivery.queue_capacity {
            config.queue_capacity = n;
        }
        if let Some(hz) = file.host.tick_rate_hz {
            config.tick_rate_hz = hz;
        }
        Ok(config.validated())
    }

    /// Overlay the TOML file at `path` on top of `self`.
    pub fn with_file(&self, path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        self.with_toml(&text)
    }

    /// Replace out-of-range values with defaults, warning about each.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if self.destination_url.trim().is_empty() {
            log::warn!("[VITALS_CONFIG] Empty destination URL, using {}", defaults.destination_url);
            self.destination_url = defaults.destination_url;
        }
        if !(self.interval_seconds.is_finite() && self.interval_seconds > 0.0) {
            log::warn!(
                "[VITALS_CONFIG] Interval must be > 0 (got {}), using {}",
                self.interval_seconds,
                defaults.interval_seconds
            );
            self.interval_seconds = defaults.interval_seconds;
        }
        if !(self.delivery_timeout_secs.is_finite() && self.delivery_timeout_secs > 0.0) {
            log::warn!(
                "[VITALS_CONFIG] Delivery timeout must be > 0 (got {}), using {}",
                self.delivery_timeout_secs,
                defaults.delivery_timeout_secs
            );
            self.delivery_timeout_secs = defaults.delivery_timeout_secs;
        }
        if self.max_in_flight == 0 {
            log::warn!("[VITALS_CONFIG] max_in_flight must be > 0, using {}", defaults.max_in_flight);
            self.max_in_flight = defaults.max_in_flight;
        }
        if self.queue_capacity == 0 {
            log::warn!("[VITALS_CONFIG] queue_capacity must be > 0, using {}", defaults.queue_capacity);
            self.queue_capacity = defaults.queue_capacity;
        }
        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0) {
            log::warn!(
                "[VITALS_CONFIG] Tick rate must be > 0 (got {}), using {}",
                self.tick_rate_hz,
                defaults.tick_rate_hz
            );
            self.tick_rate_hz = defaults.tick_rate_hz;
        }
        self
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.delivery_timeout_secs)
    }
}

/// Shared, swappable view of the active config.
///
/// `Clone` is an `Arc` increment; all clones see the same config.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<SamplerConfig>>,
}

impl ConfigHandle {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn current(&self) -> SamplerConfig {
        self.inner.read().clone()
    }

    /// Run `f` against the active config without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&SamplerConfig) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn replace(&self, config: SamplerConfig) {
        *self.inner.write() = config;
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Re-read `path` whenever its modification time changes.
///
/// The file is overlaid on `base` each time, so keys removed from the file
/// revert to their base value. A file that fails to parse is logged and the
/// current config stays active.
pub fn spawn_file_watcher(
    handle: ConfigHandle,
    base: SamplerConfig,
    path: PathBuf,
    poll_every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_seen = modified_at(&path);
        log::info!(
            "[VITALS_CONFIG] Watching {} for changes (every {:?})",
            path.display(),
            poll_every
        );

        loop {
            tokio::time::sleep(poll_every).await;

            let stamp = modified_at(&path);
            if stamp.is_none() || stamp == last_seen {
                continue;
            }
            last_seen = stamp;

            match base.with_file(&path) {
                Ok(config) => {
                    if config != handle.current() {
                        log::info!(
                            "[VITALS_CONFIG] Reloaded: url={} interval={}s source={}",
                            config.destination_url,
                            config.interval_seconds,
                            config.data_source
                        );
                        handle.replace(config);
                    }
                }
                Err(e) => {
                    log::warn!("[VITALS_CONFIG] Keeping previous config: {}", e);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SamplerConfig::from_lookup(|_| None);
        assert_eq!(config, SamplerConfig::default());
        assert_eq!(config.destination_url, "http://127.0.0.1:17553/update_data");
        assert_eq!(config.interval_seconds, 0.1);
        assert_eq!(config.data_source, "Stamina");
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = SamplerConfig::from_lookup(lookup_from(&[
            ("VITALS_DESTINATION_URL", "http://10.0.0.2:9000/in"),
            ("VITALS_INTERVAL_SECONDS", "0.25"),
            ("VITALS_DATA_SOURCE", "Health"),
            ("VITALS_MAX_IN_FLIGHT", "2"),
        ]));
        assert_eq!(config.destination_url, "http://10.0.0.2:9000/in");
        assert_eq!(config.interval_seconds, 0.25);
        assert_eq!(config.data_source, "Health");
        assert_eq!(config.max_in_flight, 2);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = SamplerConfig::from_lookup(lookup_from(&[
            ("VITALS_INTERVAL_SECONDS", "-1"),
            ("VITALS_DELIVERY_TIMEOUT_SECS", "NaN"),
            ("VITALS_QUEUE_CAPACITY", "0"),
            ("VITALS_TICK_RATE_HZ", "fast"),
        ]));
        assert_eq!(config.interval_seconds, DEFAULT_INTERVAL_SECS);
        assert_eq!(config.delivery_timeout_secs, DEFAULT_DELIVERY_TIMEOUT_SECS);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.tick_rate_hz, DEFAULT_TICK_RATE_HZ);
    }

    #[test]
    fn test_toml_overlay_keeps_missing_keys() {
        let base = SamplerConfig {
            destination_url: "http://base/".to_string(),
            ..SamplerConfig::default()
        };
        let config = base
            .with_toml(
                r#"
                [general]
                send_interval_seconds = 0.5
                data_source = "Health"

                [delivery]
                max_in_flight = 8
                "#,
            )
            .unwrap();
        assert_eq!(config.destination_url, "http://base/");
        assert_eq!(config.interval_seconds, 0.5);
        assert_eq!(config.data_source, "Health");
        assert_eq!(config.max_in_flight, 8);
    }

    #[test]
    fn test_toml_parse_error() {
        let err = SamplerConfig::default().with_toml("[general\nbroken").unwrap_err();
        assert!(err.contains("Invalid config file"));
    }

    #[test]
    fn test_handle_shares_updates() {
        let handle = ConfigHandle::new(SamplerConfig::default());
        let other = handle.clone();
        other.replace(SamplerConfig {
            interval_seconds: 1.0,
            ..SamplerConfig::default()
        });
        assert_eq!(handle.current().interval_seconds, 1.0);
        assert_eq!(handle.with(|c| c.interval_seconds), 1.0);
    }

    #[tokio::test]
    async fn test_file_watcher_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vitals.toml");
        std::fs::write(&path, "[general]\ndata_source = \"Stamina\"\n").unwrap();

        let base = SamplerConfig::default();
        let handle = ConfigHandle::new(base.with_file(&path).unwrap());
        let watcher = spawn_file_watcher(
            handle.clone(),
            base,
            path.clone(),
            Duration::from_millis(20),
        );

        // Some filesystems have coarse mtime resolution
        tokio::time::sleep(Duration::from_millis(1100)).await;
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "[general]\ndata_source = \"Health\"\nsend_interval_seconds = 0.2").unwrap();
        }

        let mut reloaded = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if handle.current().data_source == "Health" {
                reloaded = true;
                break;
            }
        }
        watcher.abort();

        assert!(reloaded, "config file edit was not picked up");
        assert_eq!(handle.current().interval_seconds, 0.2);
    }
}
