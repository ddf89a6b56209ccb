//! Vitals sampler: reads player stamina or health on host ticks and forwards
//! it, rate limited, to an HTTP endpoint without blocking the tick.

pub mod clock;
pub mod config;
pub mod delivery;
pub mod host;
pub mod payload;
pub mod sampler;
pub mod selector;

pub use config::{ConfigHandle, SamplerConfig};
pub use delivery::{DeliveryStats, DeliveryWorker};
pub use sampler::{Sampler, TickResult};
pub use selector::{GameStateSnapshot, GameStateSource};
