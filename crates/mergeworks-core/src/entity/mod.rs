//! Entity types for the ball simulation.
//!
//! - [`EntityId`]: Stable identifier for a pooled ball slot
//! - [`Ball`]: Per-slot mutable state (price, eligibility, body snapshot)
//! - [`BallMessage`]: The only way other components change a ball
//!
//! # Message passing
//!
//! No component reaches into a ball's fields. The merge resolver, gates,
//! sellers and the coordinator send a [`BallMessage`] and the ball mutates
//! itself in [`Ball::receive`]. A merge therefore never lets one ball flip a
//! flag on its peer.
//!
//! # Example
//!
//! ```
//! use mergeworks_core::entity::{Ball, BallMessage, EntityId};
//! use glam::Vec2;
//!
//! let mut ball = Ball::new(EntityId::new(7));
//! ball.receive(BallMessage::Activate {
//!     position: Vec2::ZERO,
//!     base_price: 4,
//!     cooldown: 0.5,
//! });
//!
//! assert!(ball.is_active());
//! assert_eq!(ball.price(), 4);
//! assert!(!ball.is_merge_eligible());
//! ```

pub mod ball;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use ball::{Ball, BallFlags, BallMessage, PriceChange};

/// Unique identifier for a ball slot.
///
/// `EntityId` is a newtype wrapper around `u64`. Ids are assigned
/// monotonically by the pool and a slot keeps its id for the lifetime of
/// the process, across any number of spawn/despawn cycles. The id only
/// refers to a live ball while the slot is active.
///
/// # Ordering
///
/// Ids are ordered by their numeric value. The merge tie-break and all
/// deterministic iteration rely on this order.
///
/// # Example
///
/// ```
/// use mergeworks_core::entity::EntityId;
///
/// let id1 = EntityId::new(1);
/// let id2 = EntityId::new(2);
///
/// assert!(id1 < id2);
/// assert_eq!(id1.as_u64(), 1);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new `EntityId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// A ball slot at a specific spawn lifetime.
///
/// Timed transitions hold a `BallRef` instead of a bare id so that a slot
/// despawned and re-acquired between two ticks is not mistaken for the
/// ball the transition started with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BallRef {
    /// Slot identifier.
    pub id: EntityId,
    /// Generation of the slot when the reference was taken.
    pub generation: u32,
}

impl BallRef {
    /// Creates a reference to `id` at `generation`.
    #[must_use]
    pub const fn new(id: EntityId, generation: u32) -> Self {
        Self { id, generation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod entity_id_tests {
        use super::*;

        #[test]
        fn new_and_as_u64() {
            let id = EntityId::new(42);
            assert_eq!(id.as_u64(), 42);
        }

        #[test]
        fn ordering() {
            let id1 = EntityId::new(1);
            let id2 = EntityId::new(2);
            let id3 = EntityId::new(3);

            assert!(id1 < id2);
            assert!(id2 < id3);
            assert_eq!(id1.max(id3), id3);
        }

        #[test]
        fn debug_and_display() {
            let id = EntityId::new(42);
            assert_eq!(format!("{id:?}"), "EntityId(42)");
            assert_eq!(format!("{id}"), "42");
        }

        #[test]
        fn from_conversions() {
            let id: EntityId = 42u64.into();
            assert_eq!(id, EntityId::new(42));

            let raw: u64 = id.into();
            assert_eq!(raw, 42);
        }

        #[test]
        fn serialization_roundtrip() {
            let id = EntityId::new(12345);
            let json = serde_json::to_string(&id).unwrap();
            let deserialized: EntityId = serde_json::from_str(&json).unwrap();
            assert_eq!(id, deserialized);
        }
    }

    #[test]
    fn ball_ref_distinguishes_generations() {
        let a = BallRef::new(EntityId::new(3), 1);
        let b = BallRef::new(EntityId::new(3), 2);
        assert_ne!(a, b);
        assert_eq!(a.id, b.id);
    }
}
