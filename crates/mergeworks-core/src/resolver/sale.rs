//! Sale resolution.
//!
//! A ball entering a seller is flagged `SELLING` and held for the seller's
//! duration. If the ball is still the same spawn when the timer runs out,
//! the sale completes with the ball's price at that moment. If it vanished
//! in the meantime (absorbed by a merge, despawned by the host) the sale is
//! dropped and nothing is credited.

use tracing::debug;

use super::{Progress, Resolver};
use crate::entity::{BallMessage, BallRef, EntityId};
use crate::gadget::GadgetId;
use crate::pool::BallPool;

/// How a sale ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleOutcome {
    /// The ball should be credited and despawned.
    Completed {
        /// Seller that ran the sale.
        seller: GadgetId,
        /// The sold ball.
        entity: EntityId,
        /// Its price at completion.
        price: u64,
    },
    /// The ball vanished first.
    Aborted {
        /// Seller that ran the sale.
        seller: GadgetId,
        /// The ball that vanished.
        entity: EntityId,
    },
}

#[derive(Debug, Clone)]
struct Sale {
    seller: GadgetId,
    ball: BallRef,
    progress: Progress,
}

/// Runs sell transitions.
#[derive(Debug, Clone, Default)]
pub struct SaleResolver {
    sales: Vec<Sale>,
}

impl SaleResolver {
    /// Creates a resolver with no sales running.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts selling `id` in `seller` over `duration` seconds.
    ///
    /// Returns `false` if the ball is not active or is already selling.
    pub fn begin(&mut self, pool: &mut BallPool, seller: GadgetId, id: EntityId, duration: f32) -> bool {
        let Some(ball) = pool.get_active(id) else {
            return false;
        };
        if ball.is_selling() {
            return false;
        }
        let handle = ball.handle();

        pool.send(id, BallMessage::BeginSale);
        self.sales.push(Sale {
            seller,
            ball: handle,
            progress: Progress::new(duration),
        });
        debug!(%seller, %id, "sale started");
        true
    }

    /// Returns `true` if `id` is being sold.
    #[must_use]
    pub fn is_selling(&self, id: EntityId) -> bool {
        self.sales.iter().any(|s| s.ball.id == id)
    }
}

impl Resolver for SaleResolver {
    type Outcome = SaleOutcome;

    fn advance(&mut self, dt: f32, pool: &mut BallPool) -> Vec<SaleOutcome> {
        let mut outcomes = Vec::new();
        self.sales.retain_mut(|sale| {
            let live = pool
                .get_active(sale.ball.id)
                .filter(|b| b.generation() == sale.ball.generation);
            let Some(ball) = live else {
                debug!(seller = %sale.seller, id = %sale.ball.id, "sale aborted");
                outcomes.push(SaleOutcome::Aborted {
                    seller: sale.seller,
                    entity: sale.ball.id,
                });
                return false;
            };

            sale.progress.advance(dt);
            if !sale.progress.is_complete() {
                return true;
            }
            outcomes.push(SaleOutcome::Completed {
                seller: sale.seller,
                entity: sale.ball.id,
                price: ball.price(),
            });
            false
        });
        outcomes
    }

    fn in_flight(&self) -> usize {
        self.sales.len()
    }
}
