//! Stand-in for the game: a player entity whose vitals change over time,
//! and the tick loop that drives the sampler.

use crate::config::ConfigHandle;
use crate::sampler::Sampler;
use crate::selector::{GameStateSnapshot, GameStateSource};
use std::time::{Duration, Instant};

pub const MAX_STAMINA: f32 = 10.0;
pub const MAX_HEALTH: f32 = 100.0;

const SPRINT_SECS: f32 = 4.0;
const REST_SECS: f32 = 3.0;
const STAMINA_DRAIN_PER_SEC: f32 = 2.5;
const STAMINA_REGEN_PER_SEC: f32 = 1.5;
const HIT_EVERY_SECS: f32 = 10.0;
const HIT_DAMAGE: f32 = 15.0;
const HEALTH_REGEN_PER_SEC: f32 = 0.5;
const RESPAWN_SECS: f32 = 2.0;

/// Player entity with a sprint/rest stamina cycle and periodic damage.
///
/// Has no state to read before `spawn_delay` has elapsed and while dead.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    elapsed: f32,
    spawn_delay: f32,
    stamina: f32,
    health: f32,
    dead_for: Option<f32>,
    since_hit: f32,
}

impl SimulatedPlayer {
    pub fn new(spawn_delay: f32) -> Self {
        Self {
            elapsed: 0.0,
            spawn_delay,
            stamina: MAX_STAMINA,
            health: MAX_HEALTH,
            dead_for: None,
            since_hit: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.elapsed >= self.spawn_delay && self.dead_for.is_none()
    }

    fn is_sprinting(&self) -> bool {
        let phase = (self.elapsed - self.spawn_delay) % (SPRINT_SECS + REST_SECS);
        phase < SPRINT_SECS
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
        if self.elapsed < self.spawn_delay {
            return;
        }

        if let Some(dead_for) = self.dead_for.as_mut() {
            *dead_for += dt;
            if *dead_for >= RESPAWN_SECS {
                self.dead_for = None;
                self.stamina = MAX_STAMINA;
                self.health = MAX_HEALTH;
                self.since_hit = 0.0;
            }
            return;
        }

        if self.is_sprinting() {
            self.stamina = (self.stamina - STAMINA_DRAIN_PER_SEC * dt).max(0.0);
        } else {
            self.stamina = (self.stamina + STAMINA_REGEN_PER_SEC * dt).min(MAX_STAMINA);
        }

        self.since_hit += dt;
        if self.since_hit >= HIT_EVERY_SECS {
            self.since_hit = 0.0;
            self.health -= HIT_DAMAGE;
        } else {
            self.health = (self.health + HEALTH_REGEN_PER_SEC * dt).min(MAX_HEALTH);
        }

        if self.health <= 0.0 {
            self.health = 0.0;
            self.dead_for = Some(0.0);
        }
    }
}

impl GameStateSource for SimulatedPlayer {
    fn snapshot(&self) -> Option<GameStateSnapshot> {
        if !self.is_alive() {
            return None;
        }
        Some(GameStateSnapshot {
            stamina: self.stamina,
            health: self.health,
        })
    }
}

/// Tick the player and the sampler at the configured rate until `shutdown` resolves.
pub async fn run_host_loop<F>(
    mut sampler: Sampler,
    mut player: SimulatedPlayer,
    config: ConfigHandle,
    stats_every: Duration,
    shutdown: F,
) -> Sampler
where
    F: std::future::Future<Output = ()>,
{
    let tick_rate = config.with(|c| c.tick_rate_hz);
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / tick_rate));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let started = Instant::now();
    let mut last_tick = started;
    let mut last_stats = started;
    tokio::pin!(shutdown);

    log::info!("[VITALS_SAMPLER] Host loop started ({} ticks/s)", tick_rate);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let now = Instant::now();
                player.advance(now.duration_since(last_tick).as_secs_f32());
                last_tick = now;

                sampler.tick_from(now.duration_since(started).as_secs_f64(), &player);

                if now.duration_since(last_stats) >= stats_every {
                    last_stats = now;
                    let stats = sampler.worker().stats();
                    log::info!(
                        "[VITALS_SAMPLER] Deliveries: {} sent, {} ok, {} failed, {} dropped, {} in flight; {} failed reads",
                        stats.dispatched,
                        stats.succeeded,
                        stats.failed,
                        stats.dropped,
                        stats.in_flight,
                        sampler.read_failures()
                    );
                }
            }
        }
    }

    log::info!("[VITALS_SAMPLER] Host loop stopped");
    sampler
}
