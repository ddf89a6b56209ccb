//! Background delivery of encoded samples.
//!
//! The sampler hands jobs to a bounded queue with `try_send` and moves on.
//! A dispatcher task drains the queue and runs each POST in its own task,
//! with a semaphore capping how many are in flight at once. When the
//! destination is slow and the queue fills up, new samples are dropped:
//! the next tick will produce a fresher one anyway.

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use vitals_types::{DeliveryOutcome, Sample};

/// Response bodies longer than this are cut before logging
const MAX_LOGGED_BODY_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryError {
    /// Destination answered with a non-2xx status
    Http { status: u16, body: String },
    /// Request never got a response (refused, timed out, DNS, ...)
    Transport(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Http { status, body } => write!(f, "[HTTP {}] {}", status, body),
            DeliveryError::Transport(detail) => write!(f, "{}", detail),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Build the connection pool shared by every delivery.
///
/// `timeout` is only the fallback; each job sets its own from the live config.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .pool_max_idle_per_host(5)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(timeout)
        .build()
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("Request timed out: {}", e)
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        format!("Request failed: {}", e)
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_LOGGED_BODY_CHARS {
        body.to_string()
    } else {
        let cut: String = body.chars().take(MAX_LOGGED_BODY_CHARS).collect();
        format!("{}...", cut)
    }
}

async fn post_payload(
    client: &Client,
    url: &str,
    payload: Vec<u8>,
    timeout: Duration,
) -> Result<u16, DeliveryError> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .timeout(timeout)
        .body(payload)
        .send()
        .await
        .map_err(|e| DeliveryError::Transport(describe_transport_error(&e)))?;

    let status = response.status();
    if status.is_success() {
        return Ok(status.as_u16());
    }

    let body = response.text().await.unwrap_or_default();
    Err(DeliveryError::Http {
        status: status.as_u16(),
        body: truncate_body(&body),
    })
}

/// POST one payload and log how it went. Never retries.
pub async fn deliver(
    client: &Client,
    url: &str,
    payload: Vec<u8>,
    timeout: Duration,
) -> DeliveryOutcome {
    let summary = String::from_utf8_lossy(&payload).into_owned();

    match post_payload(client, url, payload, timeout).await {
        Ok(status) => {
            log::debug!("[VITALS_DELIVERY] Delivered {} to {} ({})", summary, url, status);
            DeliveryOutcome::delivered(status)
        }
        Err(DeliveryError::Http { status, body }) => {
            log::warn!(
                "[VITALS_DELIVERY] Destination {} rejected {}. Status: {}, Response: {}",
                url,
                summary,
                status,
                body
            );
            DeliveryOutcome::rejected(status, body)
        }
        Err(DeliveryError::Transport(detail)) => {
            log::error!("[VITALS_DELIVERY] Failed to send {} to {}: {}", summary, url, detail);
            DeliveryOutcome::unreachable(detail)
        }
    }
}

/// A sample ready to go out, with the destination that was configured when it was taken.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub url: String,
    pub payload: Vec<u8>,
    pub timeout: Duration,
    pub sample: Sample,
}

#[derive(Debug, Default)]
struct Counters {
    dispatched: AtomicU64,
    dropped: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicU64,
}

/// Point-in-time copy of the worker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Jobs accepted into the queue
    pub dispatched: u64,
    /// Jobs refused because the queue was full or the worker had stopped
    pub dropped: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub in_flight: u64,
}

impl DeliveryStats {
    /// Accepted jobs that have not reached a terminal outcome yet
    pub fn pending(&self) -> u64 {
        self.dispatched
            .saturating_sub(self.succeeded)
            .saturating_sub(self.failed)
    }
}

/// Handle used by the sampler to hand off jobs. Cheap to clone.
#[derive(Clone)]
pub struct DeliveryWorker {
    tx: mpsc::Sender<DeliveryJob>,
    counters: Arc<Counters>,
}

impl DeliveryWorker {
    /// Start the dispatcher task. Must be called from inside a tokio runtime.
    pub fn spawn(client: Client, queue_capacity: usize, max_in_flight: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));

        log::info!(
            "[VITALS_DELIVERY] Worker started (queue: {}, max in flight: {})",
            queue_capacity,
            max_in_flight
        );
        tokio::spawn(Self::dispatch_loop(client, rx, semaphore, counters.clone()));

        Self { tx, counters }
    }

    /// Queue a job without waiting. Returns false if the job was dropped.
    pub fn dispatch(&self, job: DeliveryJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => {
                self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "[VITALS_DELIVERY] Queue full, dropping {} sample ({})",
                    job.sample.data_type,
                    job.sample.value
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                log::error!(
                    "[VITALS_DELIVERY] Worker stopped, dropping {} sample ({})",
                    job.sample.data_type,
                    job.sample.value
                );
                false
            }
        }
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            in_flight: self.counters.in_flight.load(Ordering::Relaxed),
        }
    }

    async fn dispatch_loop(
        client: Client,
        mut rx: mpsc::Receiver<DeliveryJob>,
        semaphore: Arc<Semaphore>,
        counters: Arc<Counters>,
    ) {
        while let Some(job) = rx.recv().await {
            // Wait for a free slot before pulling more work; the queue absorbs bursts meanwhile
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };

            counters.in_flight.fetch_add(1, Ordering::Relaxed);
            let client = client.clone();
            let counters = counters.clone();

            tokio::spawn(async move {
                let outcome = deliver(&client, &job.url, job.payload, job.timeout).await;
                if outcome.success {
                    counters.succeeded.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                }
                counters.in_flight.fetch_sub(1, Ordering::Relaxed);
                drop(permit);
            });
        }

        log::info!("[VITALS_DELIVERY] Worker stopped");
    }
}
