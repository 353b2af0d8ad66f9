//! Spawners (activators).
//!
//! A spawner accumulates elapsed time and emits one [`SpawnRequest`] per
//! full interval. Each request is offset from the spawner position by a
//! uniformly distributed point in a disc of `jitter_radius`, drawn from a
//! `ChaCha8Rng` so that the same seed always yields the same positions.
//!
//! A long frame catches up at most [`MAX_SPAWNS_PER_TICK`] intervals; the
//! rest of the backlog is dropped.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::GadgetId;
use crate::config::{non_negative, ConfigError};

/// Most spawn requests a single [`Spawner::tick`] returns.
pub const MAX_SPAWNS_PER_TICK: usize = 8;

/// Spawner tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Spawn point.
    pub position: Vec2,
    /// Radius of the random offset disc.
    pub jitter_radius: f32,
    /// Seconds between spawns. Zero disables the spawner.
    pub interval: f32,
    /// Price of spawned balls.
    pub base_price: u64,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            jitter_radius: 0.25,
            interval: 1.0,
            base_price: 1,
        }
    }
}

impl SpawnerConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for negative or non-finite values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("spawner.jitter_radius", self.jitter_radius)?;
        non_negative("spawner.interval", self.interval)
    }
}

/// A request for the world to spawn one ball.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Spawn position.
    pub position: Vec2,
    /// Spawn price.
    pub base_price: u64,
}

/// A placed spawner.
#[derive(Debug, Clone)]
pub struct Spawner {
    id: GadgetId,
    config: SpawnerConfig,
    elapsed: f32,
    rng: ChaCha8Rng,
}

impl Spawner {
    /// Creates a spawner with its own deterministic RNG stream.
    #[must_use]
    pub fn new(id: GadgetId, config: SpawnerConfig, seed: u64) -> Self {
        Self {
            id,
            config,
            elapsed: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Spawner identifier.
    #[must_use]
    pub const fn id(&self) -> GadgetId {
        self.id
    }

    /// Spawner tunables.
    #[must_use]
    pub const fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    /// Advances the timer and returns the spawns due this tick.
    pub fn tick(&mut self, dt: f32) -> Vec<SpawnRequest> {
        let interval = self.config.interval;
        if interval <= 0.0 || !interval.is_finite() {
            return Vec::new();
        }
        self.elapsed += dt.max(0.0);

        let mut requests = Vec::new();
        while self.elapsed >= interval && requests.len() < MAX_SPAWNS_PER_TICK {
            self.elapsed -= interval;
            requests.push(SpawnRequest {
                position: self.config.position + self.jitter(),
                base_price: self.config.base_price,
            });
        }
        if self.elapsed >= interval {
            self.elapsed = if self.elapsed.is_finite() {
                self.elapsed % interval
            } else {
                0.0
            };
        }
        requests
    }

    fn jitter(&mut self) -> Vec2 {
        let radius = self.config.jitter_radius;
        if radius <= 0.0 {
            return Vec2::ZERO;
        }
        let r = radius * self.rng.gen::<f32>().sqrt();
        let theta = self.rng.gen_range(0.0..std::f32::consts::TAU);
        Vec2::from_angle(theta) * r
    }
}
