//! Scenario tests that drive a whole [`World`](crate::world::World).
//!
//! # Test Structure
//!
//! - `helpers.rs`: world factories and ball setup utilities
//! - `integration.rs`: end-to-end merge, gate, sale and despawn scenarios
//! - `determinism.rs`: same seed and inputs give the same event stream
//! - `properties.rs`: proptest checks of pool, ledger, price and shop invariants

mod helpers;
