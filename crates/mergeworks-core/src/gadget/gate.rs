//! Value-modifier gates.
//!
//! A gate modifies a ball's price the first time the ball passes through
//! it during a spawn lifetime. Later passes are reported as
//! [`GateOutcome::Repeat`] and change nothing. When the ball despawns the
//! world calls [`Gate::forget`], so the same slot can be processed again
//! after it respawns.
//!
//! # Example
//!
//! ```
//! use mergeworks_core::entity::EntityId;
//! use mergeworks_core::gadget::{GadgetId, Gate, GateEffect, GateOutcome};
//!
//! let mut gate = Gate::new(GadgetId::new(0), GateEffect::Multiply(2.0));
//! let ball = EntityId::new(1);
//!
//! assert_eq!(gate.process(ball, 3), GateOutcome::Applied { old: 3, new: 6 });
//! assert_eq!(gate.process(ball, 6), GateOutcome::Repeat);
//!
//! gate.forget(ball);
//! assert_eq!(gate.process(ball, 3), GateOutcome::Applied { old: 3, new: 6 });
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::GadgetId;
use crate::entity::EntityId;

/// The operation a gate applies to a price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GateEffect {
    /// Add a fixed amount.
    Add(u64),
    /// Multiply by a factor, rounding to the nearest integer.
    Multiply(f64),
    /// Subtract a fixed amount.
    Subtract(u64),
}

impl GateEffect {
    /// Applies the effect to `price`. The result is never below 1.
    #[must_use]
    pub fn apply(self, price: u64) -> u64 {
        let result = match self {
            Self::Add(amount) => price.saturating_add(amount),
            Self::Subtract(amount) => price.saturating_sub(amount),
            Self::Multiply(factor) => scale(price, factor),
        };
        result.max(1)
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn scale(price: u64, factor: f64) -> u64 {
    let scaled = (price as f64 * factor).round();
    if scaled.is_nan() || scaled < 1.0 {
        1
    } else if scaled >= u64::MAX as f64 {
        u64::MAX
    } else {
        scaled as u64
    }
}

/// Result of a ball passing through a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateOutcome {
    /// First pass this lifetime; the price should become `new`.
    Applied {
        /// Price before.
        old: u64,
        /// Price after.
        new: u64,
    },
    /// Already processed this lifetime; nothing changes.
    Repeat,
}

/// A one-shot price modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    id: GadgetId,
    effect: GateEffect,
    processed: BTreeSet<EntityId>,
}

impl Gate {
    /// Creates a gate with no processed balls.
    #[must_use]
    pub fn new(id: GadgetId, effect: GateEffect) -> Self {
        Self {
            id,
            effect,
            processed: BTreeSet::new(),
        }
    }

    /// Gate identifier.
    #[must_use]
    pub const fn id(&self) -> GadgetId {
        self.id
    }

    /// Configured effect.
    #[must_use]
    pub const fn effect(&self) -> GateEffect {
        self.effect
    }

    /// Handles a ball with the given current price passing through.
    pub fn process(&mut self, ball: EntityId, price: u64) -> GateOutcome {
        if !self.processed.insert(ball) {
            return GateOutcome::Repeat;
        }
        GateOutcome::Applied {
            old: price,
            new: self.effect.apply(price),
        }
    }

    /// Returns `true` if `ball` was processed in its current lifetime.
    #[must_use]
    pub fn has_processed(&self, ball: EntityId) -> bool {
        self.processed.contains(&ball)
    }

    /// Forgets a despawned ball, re-arming the gate for its next lifetime.
    pub fn forget(&mut self, ball: EntityId) {
        self.processed.remove(&ball);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod effect_tests {
        use super::*;

        #[test]
        fn add() {
            assert_eq!(GateEffect::Add(5).apply(3), 8);
            assert_eq!(GateEffect::Add(5).apply(u64::MAX), u64::MAX);
        }

        #[test]
        fn subtract_floors_at_one() {
            assert_eq!(GateEffect::Subtract(2).apply(10), 8);
            assert_eq!(GateEffect::Subtract(10).apply(10), 1);
            assert_eq!(GateEffect::Subtract(100).apply(3), 1);
        }

        #[test]
        fn multiply_rounds() {
            assert_eq!(GateEffect::Multiply(2.0).apply(3), 6);
            assert_eq!(GateEffect::Multiply(1.5).apply(3), 5);
        }

        #[test]
        fn multiply_floors_at_one() {
            assert_eq!(GateEffect::Multiply(0.1).apply(3), 1);
            assert_eq!(GateEffect::Multiply(-4.0).apply(3), 1);
            assert_eq!(GateEffect::Multiply(f64::NAN).apply(3), 1);
        }

        #[test]
        fn multiply_saturates() {
            assert_eq!(GateEffect::Multiply(1e30).apply(10), u64::MAX);
        }

        #[test]
        fn effect_is_data() {
            let json = serde_json::to_string(&GateEffect::Add(3)).unwrap();
            assert_eq!(json, r#"{"Add":3}"#);
            let parsed: GateEffect = serde_json::from_str(r#"{"Multiply":2.0}"#).unwrap();
            assert_eq!(parsed, GateEffect::Multiply(2.0));
        }
    }

    mod process_tests {
        use super::*;

        #[test]
        fn second_pass_is_repeat() {
            let mut gate = Gate::new(GadgetId::new(1), GateEffect::Add(1));
            let ball = EntityId::new(0);
            assert!(matches!(gate.process(ball, 1), GateOutcome::Applied { .. }));
            assert_eq!(gate.process(ball, 2), GateOutcome::Repeat);
            assert!(gate.has_processed(ball));
        }

        #[test]
        fn balls_are_independent() {
            let mut gate = Gate::new(GadgetId::new(1), GateEffect::Add(1));
            gate.process(EntityId::new(0), 1);
            assert_eq!(
                gate.process(EntityId::new(1), 1),
                GateOutcome::Applied { old: 1, new: 2 }
            );
        }

        #[test]
        fn forget_rearms() {
            let mut gate = Gate::new(GadgetId::new(1), GateEffect::Subtract(1));
            let ball = EntityId::new(4);
            gate.process(ball, 5);
            gate.forget(ball);
            assert!(!gate.has_processed(ball));
            assert_eq!(gate.process(ball, 5), GateOutcome::Applied { old: 5, new: 4 });
        }

        #[test]
        fn forget_unknown_is_noop() {
            let mut gate = Gate::new(GadgetId::new(1), GateEffect::Add(1));
            gate.forget(EntityId::new(9));
            assert!(!gate.has_processed(EntityId::new(9)));
        }
    }
}
