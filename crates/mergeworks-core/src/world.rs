//! The world: owner of every subsystem and the per-frame tick.
//!
//! [`World::step`] runs the tick phases in a fixed order:
//!
//! 1. **COOLDOWN**: every active ball advances its eligibility cooldown
//! 2. **COLLIDE**: queued collision notifications are checked in delivery
//!    order and legal pairs start merging
//! 3. **MERGE**: merge transitions advance; completed ones despawn the
//!    absorbed ball
//! 4. **SELL**: sale transitions advance; completed ones credit the ledger
//!    and despawn the sold ball
//! 5. **SPAWN**: spawners advance and their requests are serviced
//! 6. **ADVANCE**: the tick counter increments
//!
//! Despawns raised in any phase go through the
//! [`DespawnCoordinator`] straight away, and gates forget the ball in the
//! same call. Running transitions notice the vanished participant at their
//! next resume point.
//!
//! # Determinism
//!
//! Balls, gadgets and transitions are all iterated in a fixed order
//! (`BTreeMap` by id, transitions by start order) and spawner jitter comes
//! from seeded `ChaCha8Rng`s, so the same config and inputs yield the same
//! event stream.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use mergeworks_core::config::SimConfig;
//! use mergeworks_core::economy::MemoryStore;
//! use mergeworks_core::world::World;
//!
//! let mut world = World::new(SimConfig::default(), Box::new(MemoryStore::new()));
//! let a = world.spawn(Vec2::new(0.0, 0.0), 4);
//! let b = world.spawn(Vec2::new(0.2, 0.0), 4);
//!
//! world.step(0.6); // both cool down
//! world.notify_collision(a, b);
//! world.step(0.1); // merge starts
//! world.step(0.2); // merge completes
//!
//! assert_eq!(world.pool().active_count(), 1);
//! assert_eq!(world.price(b), Some(8));
//! assert!(world.pool().is_pooled(a));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use tracing::{debug, trace};

use crate::config::SimConfig;
use crate::coordinator::DespawnCoordinator;
use crate::economy::{KeyValueStore, Ledger};
use crate::entity::{BallMessage, EntityId};
use crate::event::{DespawnReason, EventLog, EventRecord, PriceCause, SimEvent};
use crate::gadget::{
    GadgetId, GadgetKind, Gate, GateEffect, GateOutcome, Seller, SellerConfig, Spawner,
    SpawnerConfig,
};
use crate::pool::BallPool;
use crate::resolver::{MergeOutcome, MergeResolver, Resolver, SaleOutcome, SaleResolver};
use crate::shop::Shop;

// =============================================================================
// World
// =============================================================================

/// Owns the pool, resolvers, gadgets, ledger and shop.
pub struct World {
    config: SimConfig,
    tick: u64,
    pool: BallPool,
    coordinator: DespawnCoordinator,
    merges: MergeResolver,
    sales: SaleResolver,
    gates: BTreeMap<GadgetId, Gate>,
    sellers: BTreeMap<GadgetId, Seller>,
    spawners: BTreeMap<GadgetId, Spawner>,
    next_gadget: u32,
    ledger: Ledger,
    shop: Shop,
    events: EventLog,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.tick)
            .field("active", &self.pool.active_count())
            .field("pooled", &self.pool.pooled_count())
            .field("merges", &self.merges.in_flight())
            .field("sales", &self.sales.in_flight())
            .field("gates", &self.gates.len())
            .field("sellers", &self.sellers.len())
            .field("spawners", &self.spawners.len())
            .field("balance", &self.ledger.balance())
            .finish_non_exhaustive()
    }
}

impl World {
    /// Creates a world, prewarming the pool and opening the ledger on
    /// `store`.
    ///
    /// `config` is used as given; call [`SimConfig::validate`] first if it
    /// did not come from [`SimConfig::load`].
    #[must_use]
    pub fn new(config: SimConfig, store: Box<dyn KeyValueStore>) -> Self {
        let mut pool = BallPool::new();
        pool.prewarm(config.pool.prewarm);
        Self {
            merges: MergeResolver::new(config.merge.clone()),
            shop: Shop::new(config.shop.clone()),
            config,
            tick: 0,
            pool,
            coordinator: DespawnCoordinator::new(),
            sales: SaleResolver::new(),
            gates: BTreeMap::new(),
            sellers: BTreeMap::new(),
            spawners: BTreeMap::new(),
            next_gadget: 0,
            ledger: Ledger::open(store),
            events: EventLog::new(),
        }
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advances the world by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        // COOLDOWN
        self.pool.tick_all(dt);

        // COLLIDE
        for pair in self.merges.process_collisions(&mut self.pool) {
            self.events.push(
                self.tick,
                SimEvent::MergeStarted {
                    initiator: pair.initiator.id,
                    partner: pair.partner.id,
                    price: pair.price,
                },
            );
        }

        // MERGE
        for outcome in self.merges.advance(dt, &mut self.pool) {
            self.on_merge_outcome(outcome);
        }

        // SELL
        for outcome in self.sales.advance(dt, &mut self.pool) {
            self.on_sale_outcome(outcome);
        }

        // SPAWN
        let requests: Vec<_> = self
            .spawners
            .values_mut()
            .flat_map(|spawner| spawner.tick(dt))
            .collect();
        for request in requests {
            self.spawn(request.position, request.base_price);
        }

        // ADVANCE
        self.tick += 1;
    }

    fn on_merge_outcome(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Completed {
                survivor,
                absorbed,
                change,
                price,
            } => {
                if let Some(change) = change {
                    self.events.push(
                        self.tick,
                        SimEvent::PriceChanged {
                            entity: survivor,
                            old: change.old,
                            new: change.new,
                            cause: PriceCause::Merge,
                        },
                    );
                }
                self.events.push(
                    self.tick,
                    SimEvent::MergeCompleted {
                        survivor,
                        absorbed,
                        price,
                    },
                );
                self.despawn(absorbed, DespawnReason::Merged);
            }
            MergeOutcome::Aborted { survivor, vanished } => {
                self.events
                    .push(self.tick, SimEvent::MergeAborted { survivor, vanished });
            }
        }
    }

    fn on_sale_outcome(&mut self, outcome: SaleOutcome) {
        match outcome {
            SaleOutcome::Completed {
                seller,
                entity,
                price,
            } => {
                let credited = self.sellers.get(&seller).map_or_else(
                    || i64::try_from(price).unwrap_or(i64::MAX),
                    |s| s.credit_for(price),
                );
                self.events.push(
                    self.tick,
                    SimEvent::Sold {
                        seller,
                        entity,
                        price,
                        credited,
                    },
                );
                self.ledger.add(credited);
                self.drain_ledger();
                self.despawn(entity, DespawnReason::Sold);
            }
            SaleOutcome::Aborted { seller, entity } => {
                self.events
                    .push(self.tick, SimEvent::SaleAborted { seller, entity });
            }
        }
    }

    // =========================================================================
    // Balls
    // =========================================================================

    /// Takes a ball from the pool and places it at `position` with
    /// `base_price` (raised to 1 if lower).
    pub fn spawn(&mut self, position: Vec2, base_price: u64) -> EntityId {
        let id = self.pool.acquire();
        self.coordinator.configure_and_activate(
            &mut self.pool,
            id,
            position,
            base_price,
            self.config.merge.cooldown_after_spawn,
        );
        let price = self.pool.get(id).map_or(1, |b| b.price());
        self.events
            .push(self.tick, SimEvent::Spawned { entity: id, price });
        id
    }

    /// Reports that `a` and `b` touched. Checked during the next
    /// [`World::step`]. Both sides may report the same contact.
    pub fn notify_collision(&mut self, a: EntityId, b: EntityId) {
        self.merges.enqueue(a, b);
    }

    /// Updates a ball's physics snapshot. Returns `false` for inactive ids.
    pub fn sync_body(&mut self, id: EntityId, position: Vec2, velocity: Vec2) -> bool {
        if !self.pool.is_active(id) {
            return false;
        }
        self.pool
            .send(id, BallMessage::SyncBody { position, velocity });
        true
    }

    /// Raises the despawn signal for `id` on behalf of the host.
    ///
    /// Returns `false` if the ball was already despawned or never spawned.
    /// Such requests record no events.
    pub fn request_despawn(&mut self, id: EntityId) -> bool {
        self.despawn(id, DespawnReason::External)
    }

    /// Restores a ball's spawn price. Returns `false` for inactive ids.
    pub fn reset_to_base(&mut self, id: EntityId) -> bool {
        if !self.pool.is_active(id) {
            return false;
        }
        if let Some(change) = self.pool.send(id, BallMessage::ResetToBase) {
            self.events.push(
                self.tick,
                SimEvent::PriceChanged {
                    entity: id,
                    old: change.old,
                    new: change.new,
                    cause: PriceCause::Reset,
                },
            );
        }
        true
    }

    /// Current price of an active ball.
    #[must_use]
    pub fn price(&self, id: EntityId) -> Option<u64> {
        self.pool.get_active(id).map(crate::entity::Ball::price)
    }

    fn despawn(&mut self, id: EntityId, reason: DespawnReason) -> bool {
        if !self.pool.is_active(id) {
            trace!(%id, ?reason, "despawn of inactive ball ignored");
            return false;
        }
        self.events
            .push(self.tick, SimEvent::DespawnRequested { entity: id, reason });
        let Some(despawned) = self.coordinator.on_despawn_signal(&mut self.pool, id) else {
            return false;
        };
        for gate in self.gates.values_mut() {
            gate.forget(despawned.ball.id);
        }
        debug!(%id, ?reason, "despawn routed");
        self.events
            .push(self.tick, SimEvent::Despawned { entity: id });
        true
    }

    // =========================================================================
    // Gadgets
    // =========================================================================

    fn allocate_gadget(&mut self) -> GadgetId {
        let id = GadgetId::new(self.next_gadget);
        self.next_gadget += 1;
        id
    }

    /// Places a gate.
    pub fn add_gate(&mut self, effect: GateEffect) -> GadgetId {
        let id = self.allocate_gadget();
        self.gates.insert(id, Gate::new(id, effect));
        debug!(%id, ?effect, "gate placed");
        id
    }

    /// Reports that `ball` passed through `gate`.
    ///
    /// Returns `None` if the gate does not exist or the ball is inactive.
    /// A merging ball is also refused and not recorded, so it can pass the
    /// gate again once the merge is over.
    pub fn pass_through_gate(&mut self, gate: GadgetId, ball: EntityId) -> Option<GateOutcome> {
        let state = self.pool.get_active(ball)?;
        if state.is_merging() {
            trace!(%gate, %ball, "gate contact during merge ignored");
            return None;
        }
        let price = state.price();
        let outcome = self.gates.get_mut(&gate)?.process(ball, price);

        match outcome {
            GateOutcome::Applied { old, new } => {
                if let Some(change) = self.pool.send(ball, BallMessage::SetPrice { price: new }) {
                    self.events.push(
                        self.tick,
                        SimEvent::PriceChanged {
                            entity: ball,
                            old: change.old,
                            new: change.new,
                            cause: PriceCause::Gate,
                        },
                    );
                }
                self.events.push(
                    self.tick,
                    SimEvent::GateApplied {
                        gate,
                        entity: ball,
                        old,
                        new,
                    },
                );
            }
            GateOutcome::Repeat => {
                self.events
                    .push(self.tick, SimEvent::GateRepeat { gate, entity: ball });
            }
        }
        Some(outcome)
    }

    /// Places a seller.
    pub fn add_seller(&mut self, config: SellerConfig) -> GadgetId {
        let id = self.allocate_gadget();
        self.sellers.insert(id, Seller::new(id, config));
        debug!(%id, "seller placed");
        id
    }

    /// Reports that `ball` entered `seller`, starting a sale.
    ///
    /// Returns `false` if the seller does not exist, the ball is inactive,
    /// or the ball is already being sold.
    pub fn enter_seller(&mut self, seller: GadgetId, ball: EntityId) -> bool {
        let Some(duration) = self.sellers.get(&seller).map(|s| s.config().duration) else {
            return false;
        };
        if !self.sales.begin(&mut self.pool, seller, ball, duration) {
            return false;
        }
        self.events.push(
            self.tick,
            SimEvent::SaleStarted {
                seller,
                entity: ball,
            },
        );
        true
    }

    /// Places a spawner. Its jitter stream is derived from the world seed
    /// and the number of spawners placed before it.
    pub fn add_spawner(&mut self, config: SpawnerConfig) -> GadgetId {
        let id = self.allocate_gadget();
        let index = self.spawners.len() as u64;
        let seed = self
            .config
            .seed
            .wrapping_add(index.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        self.spawners.insert(id, Spawner::new(id, config, seed));
        debug!(%id, seed, "spawner placed");
        id
    }

    // =========================================================================
    // Economy
    // =========================================================================

    /// Buys one gadget of `kind`. Returns the price paid.
    ///
    /// The gadget is not placed; call the matching `add_*` method.
    pub fn purchase(&mut self, kind: GadgetKind) -> Option<u64> {
        let price = self.shop.purchase(kind, &mut self.ledger)?;
        self.drain_ledger();
        self.events
            .push(self.tick, SimEvent::Purchased { kind, price });
        Some(price)
    }

    /// Credits the ledger directly.
    pub fn credit(&mut self, amount: i64) {
        self.ledger.add(amount);
        self.drain_ledger();
    }

    /// Debits the ledger directly. Returns `false` if unaffordable.
    pub fn spend(&mut self, amount: i64) -> bool {
        let spent = self.ledger.spend(amount);
        self.drain_ledger();
        spent
    }

    /// Overwrites the balance.
    pub fn reset_balance(&mut self, starting: i64) {
        self.ledger.reset(starting);
        self.drain_ledger();
    }

    fn drain_ledger(&mut self) {
        for change in self.ledger.take_changes() {
            self.events.push(
                self.tick,
                SimEvent::BalanceChanged {
                    old: change.old,
                    new: change.new,
                },
            );
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Configuration the world was built with.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Ticks completed so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// The ball pool.
    #[must_use]
    pub const fn pool(&self) -> &BallPool {
        &self.pool
    }

    /// The despawn coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &DespawnCoordinator {
        &self.coordinator
    }

    /// The currency ledger.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The shop.
    #[must_use]
    pub const fn shop(&self) -> &Shop {
        &self.shop
    }

    /// A placed gate.
    #[must_use]
    pub fn gate(&self, id: GadgetId) -> Option<&Gate> {
        self.gates.get(&id)
    }

    /// Number of merges in progress.
    #[must_use]
    pub fn merges_in_flight(&self) -> usize {
        self.merges.in_flight()
    }

    /// Number of sales in progress.
    #[must_use]
    pub fn sales_in_flight(&self) -> usize {
        self.sales.in_flight()
    }

    /// Drains recorded events.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        self.events.take_events()
    }
}
