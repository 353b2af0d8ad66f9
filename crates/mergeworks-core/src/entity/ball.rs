//! Ball state and the messages that mutate it.

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::{BallRef, EntityId};

bitflags! {
    /// Lifecycle and eligibility flags for a ball.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct BallFlags: u8 {
        /// The slot is handed out and in play.
        const ACTIVE = 1 << 0;
        /// The spawn cooldown has elapsed.
        const MERGE_ELIGIBLE = 1 << 1;
        /// Participating in a merge transition.
        const MERGING = 1 << 2;
        /// Inside a seller, waiting for the sale to complete.
        const SELLING = 1 << 3;
    }
}

/// A price transition reported by [`Ball::receive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    /// Price before the message.
    pub old: u64,
    /// Price after the message.
    pub new: u64,
}

/// Instructions a ball applies to itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BallMessage {
    /// Pooled to active: set base price, reset price, arm the cooldown.
    Activate {
        /// Spawn position.
        position: Vec2,
        /// Value assigned at spawn. Values below 1 are raised to 1.
        base_price: u64,
        /// Seconds before the ball may merge.
        cooldown: f32,
    },
    /// Active to pooled: clear all transient state.
    Deactivate,
    /// Advance the eligibility cooldown.
    Tick {
        /// Elapsed seconds.
        dt: f32,
    },
    /// Physics reported a new body state.
    SyncBody {
        /// Current position.
        position: Vec2,
        /// Current velocity.
        velocity: Vec2,
    },
    /// Restore the price assigned at spawn.
    ResetToBase,
    /// Overwrite the price (floored at 1).
    SetPrice {
        /// New price.
        price: u64,
    },
    /// Enter a merge transition; the ball becomes ineligible.
    BeginMerge,
    /// Interpolated merge position.
    MoveTo {
        /// New position.
        position: Vec2,
    },
    /// The merge finished and this ball survived: its price becomes twice
    /// the shared price the pair started with.
    CompleteMerge {
        /// Shared price when the merge started.
        price: u64,
        /// Cooldown before merging again.
        cooldown: f32,
    },
    /// The merge was cancelled: keep the price, restart the cooldown.
    AbortMerge {
        /// Cooldown before merging again.
        cooldown: f32,
    },
    /// Enter a seller.
    BeginSale,
}

/// Per-slot ball state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    id: EntityId,
    generation: u32,
    flags: BallFlags,
    price: u64,
    base_price: u64,
    cooldown_remaining: f32,
    position: Vec2,
    velocity: Vec2,
}

impl Ball {
    /// Creates a pooled (inactive) ball for slot `id`.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            generation: 0,
            flags: BallFlags::empty(),
            price: 1,
            base_price: 1,
            cooldown_remaining: 0.0,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
        }
    }

    /// Slot identifier.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Number of times this slot has been activated.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Reference to the current spawn lifetime of this slot.
    #[must_use]
    pub const fn handle(&self) -> BallRef {
        BallRef::new(self.id, self.generation)
    }

    /// Current flags.
    #[must_use]
    pub const fn flags(&self) -> BallFlags {
        self.flags
    }

    /// Current price (always at least 1).
    #[must_use]
    pub const fn price(&self) -> u64 {
        self.price
    }

    /// Price assigned at spawn.
    #[must_use]
    pub const fn base_price(&self) -> u64 {
        self.base_price
    }

    /// Seconds left before the ball becomes merge-eligible.
    #[must_use]
    pub const fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining
    }

    /// Last known position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Last known velocity.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Returns `true` while the slot is in play.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.flags.contains(BallFlags::ACTIVE)
    }

    /// Returns `true` while the ball is part of a merge transition.
    #[must_use]
    pub const fn is_merging(&self) -> bool {
        self.flags.contains(BallFlags::MERGING)
    }

    /// Returns `true` while the ball is inside a seller.
    #[must_use]
    pub const fn is_selling(&self) -> bool {
        self.flags.contains(BallFlags::SELLING)
    }

    /// Returns `true` if the ball may start a new merge.
    #[must_use]
    pub fn is_merge_eligible(&self) -> bool {
        self.flags.contains(BallFlags::ACTIVE | BallFlags::MERGE_ELIGIBLE)
            && !self.flags.intersects(BallFlags::MERGING | BallFlags::SELLING)
    }

    /// Applies a message to this ball.
    ///
    /// Returns the price transition if the message changed the price.
    pub fn receive(&mut self, message: BallMessage) -> Option<PriceChange> {
        let old = self.price;
        match message {
            BallMessage::Activate {
                position,
                base_price,
                cooldown,
            } => {
                self.generation = self.generation.wrapping_add(1);
                self.base_price = base_price.max(1);
                self.price = self.base_price;
                self.flags = BallFlags::ACTIVE;
                self.arm_cooldown(cooldown);
                self.position = position;
                self.velocity = Vec2::ZERO;
            }
            BallMessage::Deactivate => {
                self.flags = BallFlags::empty();
                self.cooldown_remaining = 0.0;
                self.velocity = Vec2::ZERO;
            }
            BallMessage::Tick { dt } => self.tick_cooldown(dt),
            BallMessage::SyncBody { position, velocity } => {
                self.position = position;
                self.velocity = velocity;
            }
            BallMessage::ResetToBase => self.price = self.base_price,
            BallMessage::SetPrice { price } => self.price = price.max(1),
            BallMessage::BeginMerge => {
                self.flags.remove(BallFlags::MERGE_ELIGIBLE);
                self.flags.insert(BallFlags::MERGING);
            }
            BallMessage::MoveTo { position } => self.position = position,
            BallMessage::CompleteMerge { price, cooldown } => {
                self.price = price.saturating_mul(2).max(1);
                self.flags.remove(BallFlags::MERGING);
                self.arm_cooldown(cooldown);
            }
            BallMessage::AbortMerge { cooldown } => {
                self.flags.remove(BallFlags::MERGING);
                self.arm_cooldown(cooldown);
            }
            BallMessage::BeginSale => {
                self.flags.remove(BallFlags::MERGE_ELIGIBLE);
                self.flags.insert(BallFlags::SELLING);
            }
        }

        (self.price != old).then_some(PriceChange {
            old,
            new: self.price,
        })
    }

    fn arm_cooldown(&mut self, cooldown: f32) {
        self.flags.remove(BallFlags::MERGE_ELIGIBLE);
        // Zero cooldown still waits for the next tick.
        self.cooldown_remaining = cooldown.max(0.0);
    }

    fn tick_cooldown(&mut self, dt: f32) {
        if !self.is_active() || self.is_merging() {
            return;
        }
        self.cooldown_remaining = (self.cooldown_remaining - dt.max(0.0)).max(0.0);
        if self.cooldown_remaining <= 0.0 && !self.is_selling() {
            self.flags.insert(BallFlags::MERGE_ELIGIBLE);
        }
    }
}
