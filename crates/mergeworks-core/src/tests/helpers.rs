//! Test helper functions for setting up worlds and balls.

use glam::Vec2;

use crate::config::SimConfig;
use crate::economy::{Ledger, MemoryStore, BALANCE_KEY};
use crate::entity::EntityId;
use crate::event::SimEvent;
use crate::world::World;

/// Seconds that comfortably cover the default spawn cooldown.
pub const PAST_COOLDOWN: f32 = 0.6;

// =============================================================================
// World Factories
// =============================================================================

/// Creates a world with default config and an empty in-memory store.
pub fn test_world() -> World {
    World::new(SimConfig::default(), Box::new(MemoryStore::new()))
}

/// Creates a world with the given seed and starting balance.
pub fn seeded_world(seed: u64, balance: i64) -> World {
    let config = SimConfig {
        seed,
        ..SimConfig::default()
    };
    World::new(
        config,
        Box::new(MemoryStore::with_value(BALANCE_KEY, balance)),
    )
}

/// Creates a ledger over an in-memory store holding `balance`.
pub fn test_ledger(balance: i64) -> Ledger {
    Ledger::open(Box::new(MemoryStore::with_value(BALANCE_KEY, balance)))
}

// =============================================================================
// Ball Setup
// =============================================================================

/// Spawns two touching balls of equal price and waits out their cooldown.
///
/// Returns `(lower_id, higher_id)`.
pub fn spawn_eligible_pair(world: &mut World, price: u64) -> (EntityId, EntityId) {
    let a = world.spawn(Vec2::new(0.0, 0.0), price);
    let b = world.spawn(Vec2::new(0.5, 0.0), price);
    world.step(PAST_COOLDOWN);
    (a.min(b), a.max(b))
}

/// Steps the world at least once, then until no merge or sale is in
/// flight, up to `max_steps`.
pub fn settle(world: &mut World, dt: f32, max_steps: usize) {
    for _ in 0..max_steps {
        world.step(dt);
        if world.merges_in_flight() == 0 && world.sales_in_flight() == 0 {
            return;
        }
    }
}

// =============================================================================
// Event Queries
// =============================================================================

/// Drains the world's events, dropping tick stamps.
pub fn drain(world: &mut World) -> Vec<SimEvent> {
    world.take_events().into_iter().map(|r| r.event).collect()
}

/// Counts events matching `pred`.
pub fn count(events: &[SimEvent], pred: impl Fn(&SimEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}
