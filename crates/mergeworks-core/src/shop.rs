//! Gadget shop with escalating prices.
//!
//! Each catalog entry has a base price and a growth factor. The price of
//! the next unit is `ceil(base_price * growth^purchased)`, and the shop
//! additionally never quotes less than the last price it charged, so prices
//! are non-decreasing no matter how floating-point rounding falls.
//!
//! # Example
//!
//! ```
//! use mergeworks_core::economy::{Ledger, MemoryStore};
//! use mergeworks_core::gadget::GadgetKind;
//! use mergeworks_core::shop::{Shop, ShopConfig};
//!
//! let mut shop = Shop::new(ShopConfig::default());
//! let mut ledger = Ledger::open(Box::new(MemoryStore::new()));
//! ledger.add(1_000);
//!
//! let first = shop.price_of(GadgetKind::Gate).unwrap();
//! assert_eq!(shop.purchase(GadgetKind::Gate, &mut ledger), Some(first));
//! assert!(shop.price_of(GadgetKind::Gate).unwrap() >= first);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ConfigError;
use crate::economy::Ledger;
use crate::gadget::GadgetKind;

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopItem {
    /// Price of the first unit.
    pub base_price: u64,
    /// Price multiplier per unit already bought.
    pub growth: f64,
}

impl ShopItem {
    /// Computes the raw escalated price after `purchased` units.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn price_after(&self, purchased: u32) -> u64 {
        let exponent = i32::try_from(purchased).unwrap_or(i32::MAX);
        let raw = (self.base_price as f64 * self.growth.powi(exponent)).ceil();
        let price = if !raw.is_finite() || raw >= u64::MAX as f64 {
            u64::MAX
        } else {
            raw as u64
        };
        price.max(self.base_price)
    }
}

/// Gadget catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Entries by gadget kind.
    pub items: BTreeMap<GadgetKind, ShopItem>,
}

impl Default for ShopConfig {
    fn default() -> Self {
        let items = [
            (GadgetKind::Spawner, 10, 1.5),
            (GadgetKind::Gate, 25, 1.35),
            (GadgetKind::Seller, 50, 1.25),
        ]
        .into_iter()
        .map(|(kind, base_price, growth)| (kind, ShopItem { base_price, growth }))
        .collect();
        Self { items }
    }
}

impl ShopConfig {
    /// Checks every catalog entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero base price or a growth
    /// factor below 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (kind, item) in &self.items {
            if item.base_price == 0 {
                return Err(ConfigError::Invalid {
                    field: "shop.items.base_price",
                    reason: format!("{kind} must cost at least 1"),
                });
            }
            if !item.growth.is_finite() || item.growth < 1.0 {
                return Err(ConfigError::Invalid {
                    field: "shop.items.growth",
                    reason: format!("{kind} growth must be >= 1, got {}", item.growth),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Purchases {
    count: u32,
    last_price: u64,
}

/// Shop state: catalog plus purchase history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    config: ShopConfig,
    purchases: BTreeMap<GadgetKind, Purchases>,
}

impl Shop {
    /// Creates a shop with nothing purchased.
    #[must_use]
    pub fn new(config: ShopConfig) -> Self {
        Self {
            config,
            purchases: BTreeMap::new(),
        }
    }

    /// Price of the next unit of `kind`, or `None` if it is not sold.
    #[must_use]
    pub fn price_of(&self, kind: GadgetKind) -> Option<u64> {
        let item = self.config.items.get(&kind)?;
        let history = self.purchases.get(&kind).copied().unwrap_or_default();
        Some(item.price_after(history.count).max(history.last_price))
    }

    /// Number of units of `kind` bought so far.
    #[must_use]
    pub fn purchased(&self, kind: GadgetKind) -> u32 {
        self.purchases.get(&kind).map_or(0, |p| p.count)
    }

    /// Buys one unit of `kind`, paying through `ledger`.
    ///
    /// Returns the price paid, or `None` with nothing changed if the kind
    /// is not sold or the balance does not cover it.
    pub fn purchase(&mut self, kind: GadgetKind, ledger: &mut Ledger) -> Option<u64> {
        let price = self.price_of(kind)?;
        let amount = i64::try_from(price).ok()?;
        if !ledger.spend(amount) {
            return None;
        }

        let entry = self.purchases.entry(kind).or_default();
        entry.count = entry.count.saturating_add(1);
        entry.last_price = price;
        info!(%kind, price, count = entry.count, "gadget purchased");
        Some(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::{MemoryStore, BALANCE_KEY};

    fn rich_ledger(balance: i64) -> Ledger {
        Ledger::open(Box::new(MemoryStore::with_value(BALANCE_KEY, balance)))
    }

    #[test]
    fn first_price_is_base_price() {
        let shop = Shop::new(ShopConfig::default());
        assert_eq!(shop.price_of(GadgetKind::Spawner), Some(10));
        assert_eq!(shop.price_of(GadgetKind::Seller), Some(50));
    }

    #[test]
    fn prices_escalate() {
        let mut shop = Shop::new(ShopConfig::default());
        let mut ledger = rich_ledger(10_000);

        let paid: Vec<_> = (0..4)
            .map(|_| shop.purchase(GadgetKind::Spawner, &mut ledger).unwrap())
            .collect();
        // 10, 15, 22.5 -> 23, 33.75 -> 34
        assert_eq!(paid, vec![10, 15, 23, 34]);
        assert_eq!(shop.purchased(GadgetKind::Spawner), 4);
        assert_eq!(ledger.balance(), 10_000 - 82);
    }

    #[test]
    fn insufficient_funds_changes_nothing() {
        let mut shop = Shop::new(ShopConfig::default());
        let mut ledger = rich_ledger(5);

        assert_eq!(shop.purchase(GadgetKind::Gate, &mut ledger), None);
        assert_eq!(ledger.balance(), 5);
        assert_eq!(shop.purchased(GadgetKind::Gate), 0);
        assert_eq!(shop.price_of(GadgetKind::Gate), Some(25));
    }

    #[test]
    fn unknown_kind_is_not_sold() {
        let mut shop = Shop::new(ShopConfig {
            items: BTreeMap::new(),
        });
        let mut ledger = rich_ledger(100);
        assert_eq!(shop.price_of(GadgetKind::Gate), None);
        assert_eq!(shop.purchase(GadgetKind::Gate, &mut ledger), None);
        assert_eq!(ledger.balance(), 100);
    }

    #[test]
    fn huge_counts_saturate() {
        let item = ShopItem {
            base_price: 10,
            growth: 2.0,
        };
        assert_eq!(item.price_after(10_000), u64::MAX);
    }

    #[test]
    fn growth_below_one_rejected() {
        let mut config = ShopConfig::default();
        config.items.insert(
            GadgetKind::Gate,
            ShopItem {
                base_price: 5,
                growth: 0.9,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn catalog_roundtrips_through_json() {
        let config = ShopConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: ShopConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
