//! Pool allocator for ball slots.
//!
//! The pool owns every [`Ball`] ever created. It provides:
//! - Slot storage with deterministic iteration order (`BTreeMap`)
//! - Two disjoint membership sets, `pooled` and `active`
//! - Unbounded growth: [`BallPool::acquire`] never fails
//!
//! # Lifetime
//!
//! Slots are never destroyed while the process runs. Releasing a ball only
//! moves it back to the pooled set; the pool grows but does not shrink.
//!
//! # Who calls what
//!
//! Only the [`DespawnCoordinator`](crate::coordinator::DespawnCoordinator)
//! should call [`BallPool::release`]. It guarantees at-most-once release per
//! spawn by unsubscribing from the despawn signal before releasing. The pool
//! itself tolerates a stray release by returning `false`.
//!
//! # Example
//!
//! ```
//! use mergeworks_core::pool::BallPool;
//!
//! let mut pool = BallPool::new();
//! pool.prewarm(4);
//! assert_eq!(pool.pooled_count(), 4);
//!
//! let id = pool.acquire();
//! assert!(pool.is_active(id));
//! assert_eq!(pool.pooled_count(), 3);
//!
//! assert!(pool.release(id));
//! assert!(pool.is_pooled(id));
//! assert!(!pool.release(id));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::entity::{Ball, BallMessage, BallRef, EntityId, PriceChange};

/// Growable pool of reusable ball slots.
///
/// # Determinism
///
/// Slot ids are assigned monotonically and [`BallPool::acquire`] always
/// hands out the lowest pooled id, so two pools driven by the same calls
/// hand out the same ids in the same order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BallPool {
    /// Monotonically increasing slot id counter.
    next_id: u64,
    /// Every slot ever allocated.
    balls: BTreeMap<EntityId, Ball>,
    /// Inactive slots owned by the pool.
    pooled: BTreeSet<EntityId>,
    /// Slots handed out and in play.
    active: BTreeSet<EntityId>,
}

impl BallPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates `n` inactive slots up front.
    ///
    /// There is no dedup: calling this twice allocates twice.
    pub fn prewarm(&mut self, n: usize) {
        for _ in 0..n {
            let id = self.allocate();
            self.pooled.insert(id);
        }
        trace!(n, capacity = self.capacity(), "pool prewarmed");
    }

    /// Hands out a slot, reusing the lowest pooled id or allocating a new one.
    ///
    /// The slot is moved to the active set; its state is initialized by the
    /// caller through [`BallMessage::Activate`].
    pub fn acquire(&mut self) -> EntityId {
        let id = self.pooled.pop_first().unwrap_or_else(|| self.allocate());
        self.active.insert(id);
        id
    }

    /// Returns an active slot to the pool and clears its transient state.
    ///
    /// Returns `false` without doing anything if `id` is not active.
    pub fn release(&mut self, id: EntityId) -> bool {
        if !self.active.remove(&id) {
            return false;
        }
        if let Some(ball) = self.balls.get_mut(&id) {
            ball.receive(BallMessage::Deactivate);
        }
        self.pooled.insert(id);
        true
    }

    /// Delivers a message to an active ball.
    ///
    /// Messages to pooled or unknown slots are dropped.
    pub fn send(&mut self, id: EntityId, message: BallMessage) -> Option<PriceChange> {
        if !self.active.contains(&id) {
            return None;
        }
        self.balls.get_mut(&id)?.receive(message)
    }

    /// Sends `Tick` to every active ball, in id order.
    pub fn tick_all(&mut self, dt: f32) {
        for id in &self.active {
            if let Some(ball) = self.balls.get_mut(id) {
                ball.receive(BallMessage::Tick { dt });
            }
        }
    }

    /// Returns a slot regardless of membership.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Ball> {
        self.balls.get(&id)
    }

    /// Returns a slot only while it is active.
    #[must_use]
    pub fn get_active(&self, id: EntityId) -> Option<&Ball> {
        if self.active.contains(&id) {
            self.balls.get(&id)
        } else {
            None
        }
    }

    /// Returns `true` if the reference still names the same spawn lifetime.
    #[must_use]
    pub fn is_live(&self, handle: BallRef) -> bool {
        self.get_active(handle.id)
            .is_some_and(|ball| ball.generation() == handle.generation)
    }

    /// Returns `true` if `id` is in the active set.
    #[must_use]
    pub fn is_active(&self, id: EntityId) -> bool {
        self.active.contains(&id)
    }

    /// Returns `true` if `id` is in the pooled set.
    #[must_use]
    pub fn is_pooled(&self, id: EntityId) -> bool {
        self.pooled.contains(&id)
    }

    /// Active slot ids in ascending order.
    pub fn active_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.active.iter().copied()
    }

    /// Active balls in ascending id order.
    pub fn active_balls(&self) -> impl Iterator<Item = &Ball> + '_ {
        self.active.iter().filter_map(|id| self.balls.get(id))
    }

    /// Number of balls in play.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of idle slots.
    #[must_use]
    pub fn pooled_count(&self) -> usize {
        self.pooled.len()
    }

    /// Total slots ever allocated.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.balls.len()
    }

    /// Checks that every slot is in exactly one of `pooled` and `active`.
    #[must_use]
    pub fn is_partitioned(&self) -> bool {
        self.pooled.is_disjoint(&self.active)
            && self.pooled.len() + self.active.len() == self.balls.len()
            && self
                .balls
                .keys()
                .all(|id| self.pooled.contains(id) || self.active.contains(id))
    }

    fn allocate(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        self.balls.insert(id, Ball::new(id));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn activate(pool: &mut BallPool, id: EntityId, price: u64) {
        pool.send(
            id,
            BallMessage::Activate {
                position: Vec2::ZERO,
                base_price: price,
                cooldown: 0.5,
            },
        );
    }

    mod allocation_tests {
        use super::*;

        #[test]
        fn new_creates_empty_pool() {
            let pool = BallPool::new();
            assert_eq!(pool.capacity(), 0);
            assert_eq!(pool.active_count(), 0);
            assert_eq!(pool.pooled_count(), 0);
            assert!(pool.is_partitioned());
        }

        #[test]
        fn prewarm_allocates_inactive_slots() {
            let mut pool = BallPool::new();
            pool.prewarm(5);
            assert_eq!(pool.capacity(), 5);
            assert_eq!(pool.pooled_count(), 5);
            assert_eq!(pool.active_count(), 0);
        }

        #[test]
        fn prewarm_twice_double_allocates() {
            let mut pool = BallPool::new();
            pool.prewarm(3);
            pool.prewarm(3);
            assert_eq!(pool.capacity(), 6);
        }

        #[test]
        fn acquire_reuses_lowest_pooled_id() {
            let mut pool = BallPool::new();
            pool.prewarm(3);

            let a = pool.acquire();
            let b = pool.acquire();
            assert_eq!(a, EntityId::new(0));
            assert_eq!(b, EntityId::new(1));

            pool.release(a);
            assert_eq!(pool.acquire(), a);
        }

        #[test]
        fn acquire_grows_when_empty() {
            let mut pool = BallPool::new();
            let ids: Vec<_> = (0..4).map(|_| pool.acquire()).collect();
            assert_eq!(
                ids,
                vec![
                    EntityId::new(0),
                    EntityId::new(1),
                    EntityId::new(2),
                    EntityId::new(3)
                ]
            );
            assert_eq!(pool.capacity(), 4);
            assert!(pool.is_partitioned());
        }
    }

    mod release_tests {
        use super::*;

        #[test]
        fn release_moves_to_pooled_and_deactivates() {
            let mut pool = BallPool::new();
            let id = pool.acquire();
            activate(&mut pool, id, 4);
            assert!(pool.get(id).unwrap().is_active());

            assert!(pool.release(id));
            assert!(pool.is_pooled(id));
            assert!(!pool.is_active(id));
            assert!(!pool.get(id).unwrap().is_active());
            assert!(pool.is_partitioned());
        }

        #[test]
        fn release_twice_is_noop() {
            let mut pool = BallPool::new();
            let id = pool.acquire();
            assert!(pool.release(id));
            assert!(!pool.release(id));
            assert_eq!(pool.pooled_count(), 1);
        }

        #[test]
        fn release_unknown_is_noop() {
            let mut pool = BallPool::new();
            assert!(!pool.release(EntityId::new(99)));
            assert!(pool.is_partitioned());
        }

        #[test]
        fn pool_never_shrinks() {
            let mut pool = BallPool::new();
            let ids: Vec<_> = (0..3).map(|_| pool.acquire()).collect();
            for id in ids {
                pool.release(id);
            }
            assert_eq!(pool.capacity(), 3);
            assert_eq!(pool.pooled_count(), 3);
        }
    }

    mod message_tests {
        use super::*;

        #[test]
        fn send_to_pooled_slot_is_dropped() {
            let mut pool = BallPool::new();
            pool.prewarm(1);
            let id = EntityId::new(0);
            activate(&mut pool, id, 4);
            assert!(!pool.get(id).unwrap().is_active());
        }

        #[test]
        fn tick_all_only_touches_active() {
            let mut pool = BallPool::new();
            let a = pool.acquire();
            let b = pool.acquire();
            activate(&mut pool, a, 2);
            activate(&mut pool, b, 2);
            pool.release(b);

            pool.tick_all(1.0);
            assert!(pool.get(a).unwrap().is_merge_eligible());
            assert!(!pool.get(b).unwrap().is_merge_eligible());
        }

        #[test]
        fn is_live_detects_reuse() {
            let mut pool = BallPool::new();
            let id = pool.acquire();
            activate(&mut pool, id, 2);
            let first = pool.get(id).unwrap().handle();
            assert!(pool.is_live(first));

            pool.release(id);
            assert!(!pool.is_live(first));

            let again = pool.acquire();
            assert_eq!(again, id);
            activate(&mut pool, again, 2);
            assert!(!pool.is_live(first));
            assert!(pool.is_live(pool.get(id).unwrap().handle()));
        }

        #[test]
        fn get_active_hides_pooled_slots() {
            let mut pool = BallPool::new();
            let id = pool.acquire();
            assert!(pool.get_active(id).is_some());
            pool.release(id);
            assert!(pool.get_active(id).is_none());
            assert!(pool.get(id).is_some());
        }
    }

    #[test]
    fn active_iteration_is_sorted() {
        let mut pool = BallPool::new();
        let ids: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        pool.release(ids[1]);
        pool.release(ids[3]);

        let active: Vec<_> = pool.active_ids().collect();
        assert_eq!(active, vec![ids[0], ids[2], ids[4]]);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut pool = BallPool::new();
        pool.prewarm(2);
        let id = pool.acquire();
        activate(&mut pool, id, 8);

        let json = serde_json::to_string(&pool).unwrap();
        let mut deserialized: BallPool = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.capacity(), 2);
        assert_eq!(deserialized.get(id).unwrap().price(), 8);
        // Id sequence continues after deserialization.
        deserialized.acquire();
        assert_eq!(deserialized.acquire(), EntityId::new(2));
    }
}
