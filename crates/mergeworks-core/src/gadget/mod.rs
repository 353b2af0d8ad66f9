//! Gadgets placed in the world.
//!
//! - [`Gate`]: one-shot price modifier per ball lifetime
//! - [`Seller`]: region that sells balls for currency
//! - [`Spawner`]: activator that periodically requests new balls
//!
//! Gadgets never touch balls directly. They decide what should happen and
//! the world turns that decision into [`BallMessage`](crate::entity::BallMessage)s.

pub mod gate;
pub mod seller;
pub mod spawner;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use gate::{Gate, GateEffect, GateOutcome};
pub use seller::{Seller, SellerConfig};
pub use spawner::{SpawnRequest, Spawner, SpawnerConfig, MAX_SPAWNS_PER_TICK};

/// Identifier of a placed gadget, unique within a world.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GadgetId(u32);

impl GadgetId {
    /// Creates a new `GadgetId`.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for GadgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GadgetId({})", self.0)
    }
}

impl fmt::Display for GadgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gadget types sold by the shop.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GadgetKind {
    /// Ball spawner (activator).
    Spawner,
    /// Value-modifier gate.
    Gate,
    /// Sell region.
    Seller,
}

impl fmt::Display for GadgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawner => write!(f, "Spawner"),
            Self::Gate => write!(f, "Gate"),
            Self::Seller => write!(f, "Seller"),
        }
    }
}
