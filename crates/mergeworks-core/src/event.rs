//! Events emitted by the simulation.
//!
//! Every observable change (spawn, price change, merge, sale, ledger
//! mutation, purchase) is recorded as a [`SimEvent`] wrapped in an
//! [`EventRecord`] carrying the tick it happened on. The host drains them
//! with [`EventLog::take_events`], typically once per frame, to drive
//! rendering, audio and UI.
//!
//! # Example
//!
//! ```
//! use mergeworks_core::event::{EventLog, SimEvent};
//! use mergeworks_core::entity::EntityId;
//!
//! let mut log = EventLog::new();
//! log.push(3, SimEvent::Spawned { entity: EntityId::new(0), price: 2 });
//!
//! let events = log.take_events();
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].tick, 3);
//! assert!(log.is_empty());
//! ```

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::gadget::{GadgetId, GadgetKind};

/// Why a ball's price changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceCause {
    /// Survivor of a merge.
    Merge,
    /// Passed through a gate.
    Gate,
    /// Restored to its spawn price.
    Reset,
}

/// Why a despawn was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DespawnReason {
    /// Absorbed by a merge partner.
    Merged,
    /// Consumed by a seller.
    Sold,
    /// Requested by the host (out of bounds, cleared, ...).
    External,
}

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A ball left the pool.
    Spawned {
        /// The ball.
        entity: EntityId,
        /// Its spawn price.
        price: u64,
    },
    /// A ball's price changed.
    PriceChanged {
        /// The ball.
        entity: EntityId,
        /// Previous price.
        old: u64,
        /// New price.
        new: u64,
        /// What caused the change.
        cause: PriceCause,
    },
    /// The despawn signal was raised for a ball.
    DespawnRequested {
        /// The ball.
        entity: EntityId,
        /// Why.
        reason: DespawnReason,
    },
    /// A ball was returned to the pool.
    Despawned {
        /// The ball.
        entity: EntityId,
    },
    /// Two balls started merging.
    MergeStarted {
        /// The ball that will survive.
        initiator: EntityId,
        /// The ball that will be absorbed.
        partner: EntityId,
        /// The shared price of both.
        price: u64,
    },
    /// A merge finished.
    MergeCompleted {
        /// Surviving ball.
        survivor: EntityId,
        /// Despawned ball.
        absorbed: EntityId,
        /// Survivor's new price.
        price: u64,
    },
    /// A merge was cancelled because a participant vanished.
    MergeAborted {
        /// The participant still in play, if any.
        survivor: Option<EntityId>,
        /// The participant that vanished.
        vanished: EntityId,
    },
    /// A gate modified a ball.
    GateApplied {
        /// The gate.
        gate: GadgetId,
        /// The ball.
        entity: EntityId,
        /// Price before.
        old: u64,
        /// Price after.
        new: u64,
    },
    /// A ball passed a gate it was already processed by.
    GateRepeat {
        /// The gate.
        gate: GadgetId,
        /// The ball.
        entity: EntityId,
    },
    /// A ball entered a seller.
    SaleStarted {
        /// The seller.
        seller: GadgetId,
        /// The ball.
        entity: EntityId,
    },
    /// A sale completed.
    Sold {
        /// The seller.
        seller: GadgetId,
        /// The ball.
        entity: EntityId,
        /// Ball price at completion.
        price: u64,
        /// Amount credited to the ledger.
        credited: i64,
    },
    /// A sale was cancelled because the ball vanished.
    SaleAborted {
        /// The seller.
        seller: GadgetId,
        /// The ball.
        entity: EntityId,
    },
    /// The ledger balance changed.
    BalanceChanged {
        /// Previous balance.
        old: i64,
        /// New balance.
        new: i64,
    },
    /// A gadget was bought from the shop.
    Purchased {
        /// What was bought.
        kind: GadgetKind,
        /// Price paid.
        price: u64,
    },
}

impl SimEvent {
    /// Returns the ball this event is about, if any.
    #[must_use]
    pub const fn entity(&self) -> Option<EntityId> {
        match self {
            Self::Spawned { entity, .. }
            | Self::PriceChanged { entity, .. }
            | Self::DespawnRequested { entity, .. }
            | Self::Despawned { entity }
            | Self::GateApplied { entity, .. }
            | Self::GateRepeat { entity, .. }
            | Self::SaleStarted { entity, .. }
            | Self::Sold { entity, .. }
            | Self::SaleAborted { entity, .. } => Some(*entity),
            Self::MergeStarted { initiator, .. } => Some(*initiator),
            Self::MergeCompleted { survivor, .. } => Some(*survivor),
            Self::MergeAborted { vanished, .. } => Some(*vanished),
            Self::BalanceChanged { .. } | Self::Purchased { .. } => None,
        }
    }
}

/// An event stamped with the tick it happened on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Simulation tick.
    pub tick: u64,
    /// What happened.
    pub event: SimEvent,
}

/// Append-only event buffer drained by the host.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event.
    pub fn push(&mut self, tick: u64, event: SimEvent) {
        self.records.push(EventRecord { tick, event });
    }

    /// Drains and returns all recorded events in order.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.records)
    }

    /// Recorded events, oldest first.
    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Discards all events.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
