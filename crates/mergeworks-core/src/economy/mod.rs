//! Currency ledger.
//!
//! The [`Ledger`] holds the player's balance. It is mutated only through
//! [`Ledger::add`], [`Ledger::spend`] and [`Ledger::reset`], and every
//! mutation is written through to a [`KeyValueStore`] before the call
//! returns.
//!
//! # Notifications
//!
//! Each mutation queues a [`BalanceChange`]. The world drains them with
//! [`Ledger::take_changes`] and turns them into events.
//!
//! # Example
//!
//! ```
//! use mergeworks_core::economy::{Ledger, MemoryStore};
//!
//! let mut ledger = Ledger::open(Box::new(MemoryStore::new()));
//! ledger.add(50);
//! assert!(!ledger.spend(100));
//! assert_eq!(ledger.balance(), 50);
//! assert!(ledger.spend(20));
//! assert_eq!(ledger.balance(), 30);
//! ```

mod store;

pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};

use tracing::{info, warn};

/// Key the balance is persisted under.
pub const BALANCE_KEY: &str = "balance";

/// A balance transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    /// Balance before.
    pub old: i64,
    /// Balance after.
    pub new: i64,
}

/// Persisted currency balance.
#[derive(Debug)]
pub struct Ledger {
    balance: i64,
    store: Box<dyn KeyValueStore>,
    changes: Vec<BalanceChange>,
}

impl Ledger {
    /// Opens the ledger, reading the balance from `store`.
    ///
    /// A missing, negative or unreadable value loads as 0.
    #[must_use]
    pub fn open(store: Box<dyn KeyValueStore>) -> Self {
        let balance = match store.load(BALANCE_KEY) {
            Ok(value) => value.unwrap_or(0).max(0),
            Err(err) => {
                warn!(error = %err, "failed to load balance, starting from 0");
                0
            }
        };
        Self {
            balance,
            store,
            changes: Vec::new(),
        }
    }

    /// Current balance (never negative).
    #[must_use]
    pub const fn balance(&self) -> i64 {
        self.balance
    }

    /// Credits `amount`. Non-positive amounts are ignored.
    pub fn add(&mut self, amount: i64) {
        if amount <= 0 {
            return;
        }
        self.set(self.balance.saturating_add(amount));
    }

    /// Debits `amount` if the balance covers it.
    ///
    /// Returns `false` and leaves the balance untouched if `amount` is not
    /// positive or exceeds the balance.
    pub fn spend(&mut self, amount: i64) -> bool {
        if amount <= 0 || amount > self.balance {
            return false;
        }
        self.set(self.balance - amount);
        true
    }

    /// Overwrites the balance with `starting`, clamped to zero.
    pub fn reset(&mut self, starting: i64) {
        info!(starting, "ledger reset");
        self.set(starting.max(0));
    }

    /// Returns `true` if `amount` could be spent right now.
    #[must_use]
    pub const fn can_afford(&self, amount: i64) -> bool {
        amount > 0 && amount <= self.balance
    }

    /// Drains queued balance notifications.
    pub fn take_changes(&mut self) -> Vec<BalanceChange> {
        std::mem::take(&mut self.changes)
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    fn set(&mut self, new: i64) {
        let old = self.balance;
        self.balance = new;
        if let Err(err) = self.store.save(BALANCE_KEY, new) {
            warn!(error = %err, balance = new, "failed to persist balance");
        }
        self.changes.push(BalanceChange { old, new });
    }
}
