//! Per-tick entry point tying the gate, the selector and the delivery worker together.

use crate::clock::SamplerClock;
use crate::config::ConfigHandle;
use crate::delivery::{DeliveryJob, DeliveryWorker};
use crate::payload;
use crate::selector::{self, GameStateSnapshot, GameStateSource};
use vitals_types::Sample;

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickResult {
    /// Gate closed, nothing read
    Skipped,
    /// Sample read and handed to the delivery worker
    Dispatched(Sample),
    /// Sample read but the delivery queue was full
    Dropped(Sample),
    /// Gate opened but the player state could not be read
    ReadFailed,
}

/// Driven by the host once per simulation tick, always from the same thread.
pub struct Sampler {
    clock: SamplerClock,
    config: ConfigHandle,
    worker: DeliveryWorker,
    read_failures: u64,
}

impl Sampler {
    pub fn new(config: ConfigHandle, worker: DeliveryWorker) -> Self {
        Self {
            clock: SamplerClock::new(),
            config,
            worker,
            read_failures: 0,
        }
    }

    /// Handle one tick at host time `now` (seconds).
    ///
    /// Never blocks on the network and never panics on missing state.
    pub fn on_tick(&mut self, now: f64, snapshot: Option<&GameStateSnapshot>) -> TickResult {
        let interval = self.config.with(|c| c.interval_seconds);
        if !self.clock.try_pass(now, interval) {
            return TickResult::Skipped;
        }

        let (data_source, url, timeout) = self.config.with(|c| {
            (
                c.data_source.clone(),
                c.destination_url.clone(),
                c.delivery_timeout(),
            )
        });

        let (value, data_type) = match selector::select(snapshot, &data_source) {
            Ok(read) => read,
            Err(e) => {
                self.read_failures += 1;
                log::error!("[VITALS_SAMPLER] Error reading player data: {}", e);
                return TickResult::ReadFailed;
            }
        };

        let sample = Sample {
            data_type,
            value,
            taken_at: now,
        };
        log::info!(
            "[VITALS_SAMPLER] Read Data - Type: {}, Value: {}",
            sample.data_type,
            sample.value
        );

        let job = DeliveryJob {
            url,
            payload: payload::encode(sample.data_type, sample.value),
            timeout,
            sample,
        };
        if self.worker.dispatch(job) {
            TickResult::Dispatched(sample)
        } else {
            TickResult::Dropped(sample)
        }
    }

    /// Same as [`Sampler::on_tick`], pulling the snapshot from a host source.
    pub fn tick_from<S>(&mut self, now: f64, source: &S) -> TickResult
    where
        S: GameStateSource + ?Sized,
    {
        let snapshot = source.snapshot();
        self.on_tick(now, snapshot.as_ref())
    }

    pub fn read_failures(&self) -> u64 {
        self.read_failures
    }

    pub fn last_sample_at(&self) -> Option<f64> {
        self.clock.last_sample_at()
    }

    pub fn worker(&self) -> &DeliveryWorker {
        &self.worker
    }
}
