//! Timed transitions: merges and sales.
//!
//! A resolver owns a set of in-flight transitions and advances them once
//! per tick. Transitions are explicit state machines: each stores the
//! [`BallRef`](crate::entity::BallRef)s of its participants and checks
//! them against the pool at every resume point, so a participant that was
//! despawned (or whose slot was reused) is detected before anything is
//! written.
//!
//! # Invariants
//!
//! - Resolvers never mutate a [`Ball`](crate::entity::Ball) directly; they
//!   send [`BallMessage`](crate::entity::BallMessage)s through the pool
//! - Transitions are advanced in the order they started
//! - Resolvers do not despawn. Completed outcomes name the ball to despawn
//!   and the world forwards it to the coordinator
//!
//! # Available Resolvers
//!
//! - [`MergeResolver`]: collision legality checks and merge animations
//! - [`SaleResolver`]: sell animations inside sellers

mod merge;
mod sale;

pub use merge::{MergeOutcome, MergePair, MergeResolver};
pub use sale::{SaleOutcome, SaleResolver};

use serde::{Deserialize, Serialize};

use crate::pool::BallPool;

/// A set of timed transitions advanced once per tick.
///
/// # Example
///
/// ```
/// use mergeworks_core::pool::BallPool;
/// use mergeworks_core::resolver::Resolver;
///
/// struct Idle;
///
/// impl Resolver for Idle {
///     type Outcome = ();
///
///     fn advance(&mut self, _dt: f32, _pool: &mut BallPool) -> Vec<()> {
///         Vec::new()
///     }
///
///     fn in_flight(&self) -> usize {
///         0
///     }
/// }
///
/// let mut pool = BallPool::new();
/// assert!(Idle.advance(0.1, &mut pool).is_empty());
/// ```
pub trait Resolver: Send {
    /// What a finished transition reports.
    type Outcome;

    /// Advances every in-flight transition by `dt` seconds and returns the
    /// ones that finished, in start order.
    fn advance(&mut self, dt: f32, pool: &mut BallPool) -> Vec<Self::Outcome>;

    /// Number of transitions still running.
    fn in_flight(&self) -> usize;
}

/// Elapsed-time accumulator for a transition of fixed duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    elapsed: f32,
    duration: f32,
}

impl Progress {
    /// Starts a transition of `duration` seconds. Negative durations count
    /// as zero.
    #[must_use]
    pub fn new(duration: f32) -> Self {
        Self {
            elapsed: 0.0,
            duration: duration.max(0.0),
        }
    }

    /// Adds `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
    }

    /// Completion in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Returns `true` once the full duration has elapsed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Hermite ease-in/ease-out of `t`, clamped to `[0, 1]`.
#[must_use]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
