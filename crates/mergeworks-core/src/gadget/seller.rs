//! Sell regions.
//!
//! A seller does not sell instantly: the ball plays a short sell animation
//! (`duration` seconds) driven by the
//! [`SaleResolver`](crate::resolver::SaleResolver). Only when that
//! transition completes is the ledger credited and the ball despawned.

use serde::{Deserialize, Serialize};

use super::GadgetId;
use crate::config::{non_negative, ConfigError};

/// Seller tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellerConfig {
    /// Seconds between entering the seller and the sale completing.
    pub duration: f32,
    /// Credit multiplier applied to the ball's price.
    pub multiplier: u64,
}

impl Default for SellerConfig {
    fn default() -> Self {
        Self {
            duration: 0.5,
            multiplier: 1,
        }
    }
}

impl SellerConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a negative duration or a zero
    /// multiplier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("seller.duration", self.duration)?;
        if self.multiplier == 0 {
            return Err(ConfigError::Invalid {
                field: "seller.multiplier",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// A placed sell region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seller {
    id: GadgetId,
    config: SellerConfig,
}

impl Seller {
    /// Creates a seller.
    #[must_use]
    pub fn new(id: GadgetId, config: SellerConfig) -> Self {
        Self { id, config }
    }

    /// Seller identifier.
    #[must_use]
    pub const fn id(&self) -> GadgetId {
        self.id
    }

    /// Seller tunables.
    #[must_use]
    pub const fn config(&self) -> &SellerConfig {
        &self.config
    }

    /// Amount credited for a ball sold at `price`.
    #[must_use]
    pub fn credit_for(&self, price: u64) -> i64 {
        i64::try_from(price.saturating_mul(self.config.multiplier)).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_applies_multiplier() {
        let seller = Seller::new(
            GadgetId::new(0),
            SellerConfig {
                duration: 0.0,
                multiplier: 3,
            },
        );
        assert_eq!(seller.credit_for(4), 12);
    }

    #[test]
    fn credit_saturates() {
        let seller = Seller::new(GadgetId::new(0), SellerConfig::default());
        assert_eq!(seller.credit_for(u64::MAX), i64::MAX);
    }

    #[test]
    fn zero_multiplier_rejected() {
        let config = SellerConfig {
            duration: 0.5,
            multiplier: 0,
        };
        assert!(config.validate().is_err());
        assert!(SellerConfig::default().validate().is_ok());
    }
}
