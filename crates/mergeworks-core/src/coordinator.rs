//! Despawn/respawn coordination.
//!
//! The [`DespawnCoordinator`] is the single subscriber to the despawn
//! signal. Every ball handed out by the pool is subscribed exactly once,
//! in [`DespawnCoordinator::configure_and_activate`], and unsubscribed
//! exactly once, in [`DespawnCoordinator::on_despawn_signal`], before the
//! slot goes back to the pool. A second signal for the same spawn finds no
//! subscription and is dropped, which makes double despawns harmless.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use mergeworks_core::coordinator::DespawnCoordinator;
//! use mergeworks_core::pool::BallPool;
//!
//! let mut pool = BallPool::new();
//! let mut coordinator = DespawnCoordinator::new();
//!
//! let id = pool.acquire();
//! assert!(coordinator.configure_and_activate(&mut pool, id, Vec2::ZERO, 4, 0.5));
//!
//! assert!(coordinator.on_despawn_signal(&mut pool, id).is_some());
//! assert!(coordinator.on_despawn_signal(&mut pool, id).is_none());
//! assert!(pool.is_pooled(id));
//! ```

use std::collections::BTreeSet;

use glam::Vec2;
use tracing::{debug, warn};

use crate::entity::{BallMessage, BallRef, EntityId};
use crate::pool::BallPool;

/// A completed despawn, handed to whoever needs to forget the ball.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Despawned {
    /// The spawn lifetime that ended.
    pub ball: BallRef,
    /// Price at the moment of despawn.
    pub price: u64,
}

/// Sole subscriber to the despawn signal.
#[derive(Debug, Clone, Default)]
pub struct DespawnCoordinator {
    subscribed: BTreeSet<EntityId>,
}

impl DespawnCoordinator {
    /// Creates a coordinator with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes a freshly acquired ball and subscribes to its despawn.
    ///
    /// Returns `false` without touching the ball if `id` is not active in
    /// the pool or is already subscribed.
    pub fn configure_and_activate(
        &mut self,
        pool: &mut BallPool,
        id: EntityId,
        position: Vec2,
        base_price: u64,
        cooldown: f32,
    ) -> bool {
        if !pool.is_active(id) {
            warn!(%id, "activate requested for a slot that was not acquired");
            return false;
        }
        if self.subscribed.contains(&id) {
            warn!(%id, "refusing second despawn subscription");
            return false;
        }

        pool.send(
            id,
            BallMessage::Activate {
                position,
                base_price,
                cooldown,
            },
        );
        self.subscribed.insert(id);
        debug!(%id, base_price, "ball activated");
        true
    }

    /// Handles the despawn signal for `id`.
    ///
    /// The subscription is removed before the slot is released. A signal
    /// for a ball that is not subscribed is logged and ignored.
    pub fn on_despawn_signal(&mut self, pool: &mut BallPool, id: EntityId) -> Option<Despawned> {
        if !self.subscribed.remove(&id) {
            warn!(%id, "despawn signal without a subscription, ignoring");
            return None;
        }

        let (ball, price) = pool
            .get_active(id)
            .map(|b| (b.handle(), b.price()))?;
        pool.release(id);
        debug!(%id, price, "ball despawned");
        Some(Despawned { ball, price })
    }

    /// Returns `true` if `id` currently holds a subscription.
    #[must_use]
    pub fn is_subscribed(&self, id: EntityId) -> bool {
        self.subscribed.contains(&id)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscribed.len()
    }
}
