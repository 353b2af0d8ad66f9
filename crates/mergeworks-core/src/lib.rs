//! # Mergeworks Core
//!
//! Headless simulation core for a merge-and-sell ball game.
//!
//! Balls spawn from a pool, cool down, merge with equal-priced neighbours
//! into one ball of double value, pass through gates that modify their
//! price, and are finally sold for currency. A shop sells more gadgets at
//! escalating prices.
//!
//! ## Architecture
//!
//! - **Pool**: reusable ball slots ([`pool::BallPool`])
//! - **Coordinator**: sole despawn subscriber ([`coordinator::DespawnCoordinator`])
//! - **Resolvers**: timed merge and sale transitions ([`resolver`])
//! - **Gadgets**: gates, sellers, spawners ([`gadget`])
//! - **Economy**: persisted ledger and shop ([`economy`], [`shop`])
//! - **World**: owns everything and runs the tick ([`world::World`])
//!
//! Rendering, physics and input live in the host. The host reports
//! collisions and body state, and drains [`event::SimEvent`]s each frame.
//!
//! ## Usage
//!
//! ```
//! use glam::Vec2;
//! use mergeworks_core::{MemoryStore, SimConfig, World};
//!
//! let mut world = World::new(SimConfig::default(), Box::new(MemoryStore::new()));
//! let ball = world.spawn(Vec2::ZERO, 1);
//! world.step(1.0 / 60.0);
//!
//! assert_eq!(world.price(ball), Some(1));
//! assert!(!world.take_events().is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod coordinator;
pub mod economy;
pub mod entity;
pub mod event;
pub mod gadget;
pub mod pool;
pub mod resolver;
pub mod shop;
pub mod world;

pub use config::{ConfigError, SimConfig};
pub use economy::{JsonFileStore, KeyValueStore, Ledger, MemoryStore, StoreError};
pub use entity::EntityId;
pub use event::{EventRecord, SimEvent};
pub use gadget::{GadgetId, GadgetKind, GateEffect};
pub use world::World;

#[cfg(test)]
mod tests;
