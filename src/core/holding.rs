//! Static holding reference data and holding identity

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A single position as recorded at purchase time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub particulars: String,
    pub symbol: String,
    pub exchange: String,
    #[serde(alias = "purchase_price")]
    pub purchase_price: Decimal,
    pub quantity: Decimal,
    pub sector: String,
}

impl Holding {
    pub fn key(&self) -> HoldingKey {
        HoldingKey::new(&self.symbol, &self.exchange)
    }

    /// Amount paid for the position. Always derived, never cached.
    pub fn investment(&self) -> Decimal {
        self.purchase_price * self.quantity
    }
}

/// Identity of a holding: `(symbol, exchange)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HoldingKey {
    pub symbol: String,
    pub exchange: String,
}

impl HoldingKey {
    pub fn new(symbol: &str, exchange: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
        }
    }
}

/// Composite form used for keyed results, `"{symbol}_{exchange}"`.
impl Display for HoldingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.symbol, self.exchange)
    }
}
