//! Merge resolution.
//!
//! Collisions are queued as they are reported and checked in delivery
//! order at the start of the merge phase. A pair is legal when both balls
//! are active and merge-eligible, have equal prices, and move no faster
//! than `max_velocity`. The pair is normalized so the ball with the larger
//! id always initiates, which makes the outcome independent of which side
//! reported the collision. Once a merge starts both balls are flagged
//! `MERGING`, so the mirrored notification fails the eligibility check.
//!
//! A running merge slides both balls from their start positions to the
//! start midpoint with smoothstep easing. On completion the initiator's
//! price becomes twice the shared start price, whatever happened to either
//! price in between, and the partner is handed back for despawn. If either
//! participant vanishes first, the merge aborts and the one still in play
//! keeps its price and restarts its cooldown.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{smoothstep, Progress, Resolver};
use crate::config::MergeConfig;
use crate::entity::{BallMessage, BallRef, EntityId, PriceChange};
use crate::pool::BallPool;

/// Two balls that started merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePair {
    /// Survivor-to-be (larger id).
    pub initiator: BallRef,
    /// Ball to be absorbed (smaller id).
    pub partner: BallRef,
    /// Shared price at the start.
    pub price: u64,
}

/// How a merge transition ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The initiator doubled; `absorbed` must now be despawned.
    Completed {
        /// Surviving ball.
        survivor: EntityId,
        /// Ball to despawn.
        absorbed: EntityId,
        /// Survivor's price transition, absent if already saturated.
        change: Option<PriceChange>,
        /// Survivor's price after the merge.
        price: u64,
    },
    /// A participant vanished before completion.
    Aborted {
        /// Participant still in play, if any.
        survivor: Option<EntityId>,
        /// Participant that vanished.
        vanished: EntityId,
    },
}

#[derive(Debug, Clone)]
struct MergeTransition {
    pair: MergePair,
    initiator_start: Vec2,
    partner_start: Vec2,
    midpoint: Vec2,
    progress: Progress,
}

/// Checks collisions and runs merge transitions.
#[derive(Debug, Clone)]
pub struct MergeResolver {
    config: MergeConfig,
    pending: Vec<(EntityId, EntityId)>,
    transitions: Vec<MergeTransition>,
}

impl MergeResolver {
    /// Creates a resolver with no queued collisions.
    #[must_use]
    pub fn new(config: MergeConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Merge tunables.
    #[must_use]
    pub const fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Queues a collision notification for the next merge phase.
    pub fn enqueue(&mut self, a: EntityId, b: EntityId) {
        self.pending.push((a, b));
    }

    /// Number of queued, unchecked collisions.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Checks every queued collision in delivery order and starts the legal
    /// ones.
    pub fn process_collisions(&mut self, pool: &mut BallPool) -> Vec<MergePair> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .filter_map(|(a, b)| self.try_begin(pool, a, b))
            .collect()
    }

    /// Starts a merge between `a` and `b` if the pair is legal.
    ///
    /// Illegal pairs are ignored and `None` is returned.
    pub fn try_begin(&mut self, pool: &mut BallPool, a: EntityId, b: EntityId) -> Option<MergePair> {
        let (initiator, partner) = if a >= b { (a, b) } else { (b, a) };
        if initiator == partner {
            trace!(%a, "self-collision ignored");
            return None;
        }

        let (Some(first), Some(second)) = (pool.get_active(initiator), pool.get_active(partner))
        else {
            trace!(%initiator, %partner, "collision with inactive ball ignored");
            return None;
        };
        if !first.is_merge_eligible() || !second.is_merge_eligible() {
            trace!(%initiator, %partner, "collision with ineligible ball ignored");
            return None;
        }
        if first.price() != second.price() {
            trace!(%initiator, %partner, "collision with unequal prices ignored");
            return None;
        }
        let max_velocity = self.config.max_velocity;
        if first.velocity().length() > max_velocity || second.velocity().length() > max_velocity {
            trace!(%initiator, %partner, "collision too fast to merge");
            return None;
        }

        let pair = MergePair {
            initiator: first.handle(),
            partner: second.handle(),
            price: first.price(),
        };
        let initiator_start = first.position();
        let partner_start = second.position();

        pool.send(initiator, BallMessage::BeginMerge);
        pool.send(partner, BallMessage::BeginMerge);
        self.transitions.push(MergeTransition {
            pair,
            initiator_start,
            partner_start,
            midpoint: initiator_start.lerp(partner_start, 0.5),
            progress: Progress::new(self.config.duration),
        });
        debug!(%initiator, %partner, price = pair.price, "merge started");
        Some(pair)
    }

    /// Returns `true` if `id` participates in a running merge.
    #[must_use]
    pub fn is_merging(&self, id: EntityId) -> bool {
        self.transitions
            .iter()
            .any(|t| t.pair.initiator.id == id || t.pair.partner.id == id)
    }

    fn abort(&self, pool: &mut BallPool, transition: &MergeTransition) -> MergeOutcome {
        let MergePair {
            initiator, partner, ..
        } = transition.pair;
        let initiator_live = pool.is_live(initiator);
        let partner_live = pool.is_live(partner);

        let (survivor, vanished) = match (initiator_live, partner_live) {
            (true, _) => (Some(initiator), partner.id),
            (false, true) => (Some(partner), initiator.id),
            (false, false) => (None, partner.id),
        };
        if let Some(survivor) = survivor {
            pool.send(
                survivor.id,
                BallMessage::AbortMerge {
                    cooldown: self.config.cooldown_after_spawn,
                },
            );
        }
        debug!(%vanished, "merge aborted");
        MergeOutcome::Aborted {
            survivor: survivor.map(|s| s.id),
            vanished,
        }
    }
}

impl Resolver for MergeResolver {
    type Outcome = MergeOutcome;

    fn advance(&mut self, dt: f32, pool: &mut BallPool) -> Vec<MergeOutcome> {
        let mut outcomes = Vec::new();
        let mut running = Vec::with_capacity(self.transitions.len());

        for mut transition in std::mem::take(&mut self.transitions) {
            let MergePair {
                initiator,
                partner,
                price: start_price,
            } = transition.pair;
            if !pool.is_live(initiator) || !pool.is_live(partner) {
                outcomes.push(self.abort(pool, &transition));
                continue;
            }

            transition.progress.advance(dt);
            let t = smoothstep(transition.progress.fraction());
            pool.send(
                initiator.id,
                BallMessage::MoveTo {
                    position: transition.initiator_start.lerp(transition.midpoint, t),
                },
            );
            pool.send(
                partner.id,
                BallMessage::MoveTo {
                    position: transition.partner_start.lerp(transition.midpoint, t),
                },
            );

            if !transition.progress.is_complete() {
                running.push(transition);
                continue;
            }

            let change = pool.send(
                initiator.id,
                BallMessage::CompleteMerge {
                    price: start_price,
                    cooldown: self.config.cooldown_after_spawn,
                },
            );
            let price = pool.get(initiator.id).map_or(0, |b| b.price());
            debug!(survivor = %initiator.id, absorbed = %partner.id, price, "merge completed");
            outcomes.push(MergeOutcome::Completed {
                survivor: initiator.id,
                absorbed: partner.id,
                change,
                price,
            });
        }

        self.transitions = running;
        outcomes
    }

    fn in_flight(&self) -> usize {
        self.transitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eligible(pool: &mut BallPool, price: u64, position: Vec2) -> EntityId {
        let id = pool.acquire();
        pool.send(
            id,
            BallMessage::Activate {
                position,
                base_price: price,
                cooldown: 0.0,
            },
        );
        pool.send(id, BallMessage::Tick { dt: 0.01 });
        id
    }

    fn resolver() -> MergeResolver {
        MergeResolver::new(MergeConfig::default())
    }

    mod legality_tests {
        use super::*;

        #[test]
        fn larger_id_initiates_from_either_side() {
            for swap in [false, true] {
                let mut pool = BallPool::new();
                let a = eligible(&mut pool, 4, Vec2::ZERO);
                let b = eligible(&mut pool, 4, Vec2::X);
                let mut merges = resolver();

                let (x, y) = if swap { (b, a) } else { (a, b) };
                let pair = merges.try_begin(&mut pool, x, y).unwrap();
                assert_eq!(pair.initiator.id, b);
                assert_eq!(pair.partner.id, a);
                assert_eq!(pair.price, 4);
            }
        }

        #[test]
        fn mirrored_notification_starts_one_merge() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 2, Vec2::ZERO);
            let b = eligible(&mut pool, 2, Vec2::X);
            let mut merges = resolver();

            merges.enqueue(a, b);
            merges.enqueue(b, a);
            assert_eq!(merges.process_collisions(&mut pool).len(), 1);
            assert_eq!(merges.in_flight(), 1);
            assert_eq!(merges.pending(), 0);
        }

        #[test]
        fn unequal_prices_ignored() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 2, Vec2::ZERO);
            let b = eligible(&mut pool, 4, Vec2::X);
            assert!(resolver().try_begin(&mut pool, a, b).is_none());
            assert!(pool.get(a).unwrap().is_merge_eligible());
        }

        #[test]
        fn fast_ball_ignored() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 2, Vec2::ZERO);
            let b = eligible(&mut pool, 2, Vec2::X);
            pool.send(
                b,
                BallMessage::SyncBody {
                    position: Vec2::X,
                    velocity: Vec2::new(3.0, 0.0),
                },
            );
            assert!(resolver().try_begin(&mut pool, a, b).is_none());
        }

        #[test]
        fn velocity_at_limit_is_allowed() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 2, Vec2::ZERO);
            let b = eligible(&mut pool, 2, Vec2::X);
            pool.send(
                a,
                BallMessage::SyncBody {
                    position: Vec2::ZERO,
                    velocity: Vec2::new(0.5, 0.0),
                },
            );
            assert!(resolver().try_begin(&mut pool, a, b).is_some());
        }

        #[test]
        fn cooling_down_ball_ignored() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 2, Vec2::ZERO);
            let b = pool.acquire();
            pool.send(
                b,
                BallMessage::Activate {
                    position: Vec2::X,
                    base_price: 2,
                    cooldown: 0.5,
                },
            );
            assert!(resolver().try_begin(&mut pool, a, b).is_none());
        }

        #[test]
        fn self_collision_ignored() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 2, Vec2::ZERO);
            assert!(resolver().try_begin(&mut pool, a, a).is_none());
        }

        #[test]
        fn begin_makes_both_ineligible() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 2, Vec2::ZERO);
            let b = eligible(&mut pool, 2, Vec2::X);
            let mut merges = resolver();
            merges.try_begin(&mut pool, a, b);
            assert!(pool.get(a).unwrap().is_merging());
            assert!(pool.get(b).unwrap().is_merging());
            assert!(!pool.get(a).unwrap().is_merge_eligible());
            assert!(merges.is_merging(a) && merges.is_merging(b));
        }
    }

    mod transition_tests {
        use super::*;

        #[test]
        fn completes_after_duration() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 4, Vec2::ZERO);
            let b = eligible(&mut pool, 4, Vec2::new(2.0, 0.0));
            let mut merges = resolver();
            merges.try_begin(&mut pool, a, b);

            assert!(merges.advance(0.1, &mut pool).is_empty());
            let outcomes = merges.advance(0.2, &mut pool);
            assert_eq!(
                outcomes,
                vec![MergeOutcome::Completed {
                    survivor: b,
                    absorbed: a,
                    change: Some(PriceChange { old: 4, new: 8 }),
                    price: 8,
                }]
            );
            assert_eq!(merges.in_flight(), 0);
            assert_eq!(pool.get(b).unwrap().position(), Vec2::new(1.0, 0.0));
            assert!(!pool.get(b).unwrap().is_merging());
        }

        #[test]
        fn price_set_mid_merge_does_not_change_result() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 4, Vec2::ZERO);
            let b = eligible(&mut pool, 4, Vec2::X);
            let mut merges = resolver();
            merges.try_begin(&mut pool, a, b);
            merges.advance(0.1, &mut pool);

            pool.send(b, BallMessage::SetPrice { price: 5 });
            pool.send(a, BallMessage::SetPrice { price: 1 });
            let outcomes = merges.advance(0.2, &mut pool);
            assert_eq!(
                outcomes,
                vec![MergeOutcome::Completed {
                    survivor: b,
                    absorbed: a,
                    change: Some(PriceChange { old: 5, new: 8 }),
                    price: 8,
                }]
            );
        }

        #[test]
        fn positions_ease_toward_midpoint() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 1, Vec2::ZERO);
            let b = eligible(&mut pool, 1, Vec2::new(4.0, 0.0));
            let mut merges = resolver();
            merges.try_begin(&mut pool, a, b);

            merges.advance(0.125, &mut pool);
            // smoothstep(0.5) = 0.5, halfway to the midpoint.
            assert!((pool.get(a).unwrap().position().x - 1.0).abs() < 1e-5);
            assert!((pool.get(b).unwrap().position().x - 3.0).abs() < 1e-5);
        }

        #[test]
        fn partner_vanishing_aborts() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 4, Vec2::ZERO);
            let b = eligible(&mut pool, 4, Vec2::X);
            let mut merges = resolver();
            merges.try_begin(&mut pool, a, b);
            merges.advance(0.1, &mut pool);

            pool.release(a);
            let outcomes = merges.advance(0.1, &mut pool);
            assert_eq!(
                outcomes,
                vec![MergeOutcome::Aborted {
                    survivor: Some(b),
                    vanished: a,
                }]
            );
            let survivor = pool.get(b).unwrap();
            assert_eq!(survivor.price(), 4);
            assert!(!survivor.is_merging());
            assert!((survivor.cooldown_remaining() - 0.5).abs() < f32::EPSILON);
        }

        #[test]
        fn initiator_vanishing_aborts_symmetrically() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 4, Vec2::ZERO);
            let b = eligible(&mut pool, 4, Vec2::X);
            let mut merges = resolver();
            merges.try_begin(&mut pool, a, b);

            pool.release(b);
            let outcomes = merges.advance(0.1, &mut pool);
            assert_eq!(
                outcomes,
                vec![MergeOutcome::Aborted {
                    survivor: Some(a),
                    vanished: b,
                }]
            );
            assert!(!pool.get(a).unwrap().is_merging());
        }

        #[test]
        fn reused_slot_is_not_mistaken_for_participant() {
            let mut pool = BallPool::new();
            let a = eligible(&mut pool, 4, Vec2::ZERO);
            let b = eligible(&mut pool, 4, Vec2::X);
            let mut merges = resolver();
            merges.try_begin(&mut pool, a, b);

            pool.release(a);
            let reused = eligible(&mut pool, 4, Vec2::ZERO);
            assert_eq!(reused, a);

            let outcomes = merges.advance(1.0, &mut pool);
            assert!(matches!(outcomes[0], MergeOutcome::Aborted { vanished, .. } if vanished == a));
            assert_eq!(pool.get(b).unwrap().price(), 4);
        }
    }
}
