//! # Mergeworks Python Bindings
//!
//! PyO3 bindings exposing Mergeworks Core to Python.
//!
//! ## Usage
//!
//! ```python
//! import mergeworks
//!
//! world = mergeworks.PyWorld(seed=42)
//! a = world.spawn((0.0, 0.0), 4)
//! b = world.spawn((0.2, 0.0), 4)
//!
//! world.step(0.6)          # cooldown
//! world.collide(a, b)
//! world.step(0.1)
//! world.step(0.2)
//!
//! print(world.price(b))    # 8
//! for event in world.take_events():
//!     print(event)         # JSON strings
//! ```

use glam::Vec2;
use numpy::{PyArray1, ToPyArray};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use mergeworks_core::gadget::{GateOutcome, SellerConfig, SpawnerConfig};
use mergeworks_core::{
    EntityId, GadgetId, GadgetKind, GateEffect, JsonFileStore, KeyValueStore, MemoryStore,
    SimConfig, World,
};

/// World wrapper for Python.
#[pyclass]
pub struct PyWorld {
    inner: World,
}

#[pymethods]
impl PyWorld {
    /// Create a new world.
    ///
    /// `config_path` is a JSON config file; `store_path` a JSON file the
    /// balance is persisted in (in-memory if omitted). `seed` overrides the
    /// config seed when given.
    #[new]
    #[pyo3(signature = (seed=None, config_path=None, store_path=None))]
    fn new(
        seed: Option<u64>,
        config_path: Option<&str>,
        store_path: Option<&str>,
    ) -> PyResult<Self> {
        let mut config = match config_path {
            Some(path) => {
                SimConfig::load(path).map_err(|e| PyValueError::new_err(e.to_string()))?
            }
            None => SimConfig::default(),
        };
        if let Some(seed) = seed {
            config.seed = seed;
        }
        let store: Box<dyn KeyValueStore> = match store_path {
            Some(path) => {
                Box::new(JsonFileStore::open(path).map_err(|e| PyIOError::new_err(e.to_string()))?)
            }
            None => Box::new(MemoryStore::new()),
        };
        Ok(Self {
            inner: World::new(config, store),
        })
    }

    /// Get current tick.
    #[getter]
    fn tick(&self) -> u64 {
        self.inner.tick()
    }

    /// Number of balls in play.
    #[getter]
    fn active_count(&self) -> usize {
        self.inner.pool().active_count()
    }

    /// Current balance.
    #[getter]
    fn balance(&self) -> i64 {
        self.inner.ledger().balance()
    }

    /// Spawn a ball at `position` with `price`.
    fn spawn(&mut self, position: (f32, f32), price: u64) -> PyEntityId {
        self.inner
            .spawn(Vec2::new(position.0, position.1), price)
            .into()
    }

    /// Report a collision between two balls.
    fn collide(&mut self, a: PyEntityId, b: PyEntityId) {
        self.inner.notify_collision(a.into(), b.into());
    }

    /// Update a ball's position and velocity from physics.
    fn sync_body(&mut self, id: PyEntityId, position: (f32, f32), velocity: (f32, f32)) -> bool {
        self.inner.sync_body(
            id.into(),
            Vec2::new(position.0, position.1),
            Vec2::new(velocity.0, velocity.1),
        )
    }

    /// Despawn a ball. Returns False if it was already gone.
    fn despawn(&mut self, id: PyEntityId) -> bool {
        self.inner.request_despawn(id.into())
    }

    /// Restore a ball's spawn price.
    fn reset_to_base(&mut self, id: PyEntityId) -> bool {
        self.inner.reset_to_base(id.into())
    }

    /// Advance simulation by dt seconds.
    ///
    /// Releases the GIL during computation for better Python threading.
    fn step(&mut self, py: Python, dt: f32) {
        py.allow_threads(|| {
            self.inner.step(dt);
        });
    }

    /// Advance `n` ticks of `dt` seconds each without returning to Python.
    fn run(&mut self, py: Python, n: u64, dt: f32) {
        py.allow_threads(|| {
            for _ in 0..n {
                self.inner.step(dt);
            }
        });
    }

    /// Place a gate. `op` is "add", "multiply" or "subtract".
    ///
    /// # Example
    ///
    /// ```python
    /// gate = world.add_gate("multiply", 2.0)
    /// world.pass_through_gate(gate, ball)   # "applied"
    /// world.pass_through_gate(gate, ball)   # "repeat"
    /// ```
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn add_gate(&mut self, op: &str, value: f64) -> PyResult<u32> {
        let whole = || {
            if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
                Ok(value as u64)
            } else {
                Err(PyValueError::new_err(format!(
                    "{op} needs a non-negative whole number, got {value}"
                )))
            }
        };
        let effect = match op.to_lowercase().as_str() {
            "add" => GateEffect::Add(whole()?),
            "subtract" | "sub" => GateEffect::Subtract(whole()?),
            "multiply" | "mul" => GateEffect::Multiply(value),
            _ => return Err(PyValueError::new_err(format!("unknown gate op: {op}"))),
        };
        Ok(self.inner.add_gate(effect).as_u32())
    }

    /// Report a ball passing a gate.
    ///
    /// Returns "applied", "repeat", or None if the gate or ball is unknown
    /// or the ball is merging.
    fn pass_through_gate(&mut self, gate: u32, ball: PyEntityId) -> Option<&'static str> {
        self.inner
            .pass_through_gate(GadgetId::new(gate), ball.into())
            .map(|outcome| match outcome {
                GateOutcome::Applied { .. } => "applied",
                GateOutcome::Repeat => "repeat",
            })
    }

    /// Place a seller.
    #[pyo3(signature = (duration=0.5, multiplier=1))]
    fn add_seller(&mut self, duration: f32, multiplier: u64) -> PyResult<u32> {
        let config = SellerConfig {
            duration,
            multiplier,
        };
        config
            .validate()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(self.inner.add_seller(config).as_u32())
    }

    /// Report a ball entering a seller.
    fn enter_seller(&mut self, seller: u32, ball: PyEntityId) -> bool {
        self.inner.enter_seller(GadgetId::new(seller), ball.into())
    }

    /// Place a spawner.
    #[pyo3(signature = (position, interval=1.0, jitter_radius=0.25, base_price=1))]
    fn add_spawner(
        &mut self,
        position: (f32, f32),
        interval: f32,
        jitter_radius: f32,
        base_price: u64,
    ) -> PyResult<u32> {
        let config = SpawnerConfig {
            position: Vec2::new(position.0, position.1),
            jitter_radius,
            interval,
            base_price,
        };
        config
            .validate()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(self.inner.add_spawner(config).as_u32())
    }

    /// Price of the next gadget of `kind` ("spawner", "gate", "seller").
    fn price_of(&self, kind: &str) -> PyResult<Option<u64>> {
        Ok(self.inner.shop().price_of(parse_kind(kind)?))
    }

    /// Buy a gadget. Returns the price paid, or None if unaffordable.
    fn purchase(&mut self, kind: &str) -> PyResult<Option<u64>> {
        Ok(self.inner.purchase(parse_kind(kind)?))
    }

    /// Credit the ledger.
    fn credit(&mut self, amount: i64) {
        self.inner.credit(amount);
    }

    /// Debit the ledger. Returns False if unaffordable.
    fn spend(&mut self, amount: i64) -> bool {
        self.inner.spend(amount)
    }

    /// Current price of an active ball.
    fn price(&self, id: PyEntityId) -> Option<u64> {
        self.inner.price(id.into())
    }

    /// Whether a ball is in play.
    fn is_active(&self, id: PyEntityId) -> bool {
        self.inner.pool().is_active(id.into())
    }

    /// Active ball ids in ascending order.
    fn active_ids(&self) -> Vec<PyEntityId> {
        self.inner.pool().active_ids().map(PyEntityId).collect()
    }

    /// Active ball positions as a flat `[x0, y0, x1, y1, ...]` array, in
    /// the same order as `active_ids()`.
    fn active_positions<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f32>> {
        let flat: Vec<f32> = self
            .inner
            .pool()
            .active_balls()
            .flat_map(|ball| ball.position().to_array())
            .collect();
        flat.to_pyarray(py)
    }

    /// Active ball prices, in the same order as `active_ids()`.
    fn active_prices<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<u64>> {
        let prices: Vec<u64> = self
            .inner
            .pool()
            .active_balls()
            .map(|ball| ball.price())
            .collect();
        prices.to_pyarray(py)
    }

    /// Drain events as JSON strings.
    fn take_events(&mut self) -> PyResult<Vec<String>> {
        self.inner
            .take_events()
            .iter()
            .map(|record| {
                serde_json::to_string(record).map_err(|e| PyValueError::new_err(e.to_string()))
            })
            .collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "World(tick={}, active={}, balance={})",
            self.inner.tick(),
            self.inner.pool().active_count(),
            self.inner.ledger().balance()
        )
    }
}

/// Unique ball identifier exposed to Python.
#[pyclass(frozen, eq, hash)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PyEntityId(EntityId);

#[pymethods]
impl PyEntityId {
    #[new]
    fn new(value: u64) -> Self {
        Self(EntityId::new(value))
    }

    /// Get the raw u64 value.
    #[getter]
    fn value(&self) -> u64 {
        self.0.as_u64()
    }

    fn __repr__(&self) -> String {
        format!("EntityId({})", self.0.as_u64())
    }
}

impl From<EntityId> for PyEntityId {
    fn from(id: EntityId) -> Self {
        Self(id)
    }
}

impl From<PyEntityId> for EntityId {
    fn from(id: PyEntityId) -> Self {
        id.0
    }
}

/// Convert a gadget kind name.
fn parse_kind(s: &str) -> PyResult<GadgetKind> {
    match s.to_lowercase().as_str() {
        "spawner" | "activator" => Ok(GadgetKind::Spawner),
        "gate" => Ok(GadgetKind::Gate),
        "seller" => Ok(GadgetKind::Seller),
        _ => Err(PyValueError::new_err(format!("unknown gadget kind: {s}"))),
    }
}

/// Python module definition.
#[pymodule]
fn _mergeworks(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyWorld>()?;
    m.add_class::<PyEntityId>()?;
    Ok(())
}
