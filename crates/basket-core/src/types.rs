//! # Domain Types
//!
//! Core domain types used throughout the basket engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │    Product      │   │  SalesHistory   │   │  SalesHistoryItem   │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  product_id         │   │
//! │  │  name           │   │  user_id        │   │  quantity           │   │
//! │  │  unit_price     │   │  totals ×4      │   └─────────────────────┘   │
//! │  │  vat_rate       │   │  items          │                             │
//! │  │  stock_quantity │   │  created_at     │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │    VatRate      │   1% low band, 8% standard band, 18% high band    │
//! │  │  percent (u32)  │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::cart::ShoppingCart;
use crate::money::Money;

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT rate as a whole-number percentage.
///
/// ## Bands
/// The catalog uses three bands: [`VatRate::LOW`] (1%),
/// [`VatRate::STANDARD`] (8%) and [`VatRate::HIGH`] (18%). Zero is allowed
/// for exempt goods. Only the 8% and 18% bands take part in the
/// every-fourth-order campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VatRate(u32);

impl VatRate {
    /// Low band (1%).
    pub const LOW: VatRate = VatRate(1);

    /// Standard band (8%).
    pub const STANDARD: VatRate = VatRate(8);

    /// High band (18%).
    pub const HIGH: VatRate = VatRate(18);

    /// Creates a VAT rate from a whole percentage.
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        VatRate(percent)
    }

    /// Returns the rate as a whole percentage.
    #[inline]
    pub const fn percent(&self) -> u32 {
        self.0
    }

    /// Zero VAT rate.
    #[inline]
    pub const fn zero() -> Self {
        VatRate(0)
    }

    /// Checks if VAT rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// VAT owed on `amount`, unrounded.
    #[inline]
    pub fn apply_to(&self, amount: Money) -> Money {
        amount.percentage(self.0)
    }
}

impl Default for VatRate {
    fn default() -> Self {
        VatRate::zero()
    }
}

impl fmt::Display for VatRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, copied onto cart items.
    pub name: String,

    /// Price of one unit, before VAT.
    pub unit_price: Money,

    /// VAT band for this product.
    pub vat_rate: VatRate,

    /// Units currently in stock.
    pub stock_quantity: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a new catalog product with a fresh id.
    pub fn new(
        name: impl Into<String>,
        unit_price: Money,
        vat_rate: VatRate,
        stock_quantity: i64,
    ) -> Self {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            unit_price,
            vat_rate,
            stock_quantity,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks if `quantity` units can be taken from stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

// =============================================================================
// Sales History
// =============================================================================

/// A line of a completed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesHistoryItem {
    pub product_id: String,
    pub quantity: i64,
}

/// A completed order, written once at checkout and never modified.
///
/// ## Snapshot Pattern
/// The four totals are copied from the cart at the moment of checkout.
/// The historical aggregates sum `sub_total` over these records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesHistory {
    pub id: String,
    pub user_id: String,
    pub total_price: Money,
    pub total_vat: Money,
    pub total_discount: Money,
    pub sub_total: Money,
    pub items: Vec<SalesHistoryItem>,
    pub created_at: DateTime<Utc>,
}

impl SalesHistory {
    /// Freezes a priced cart into a history record.
    pub fn from_cart(cart: &ShoppingCart) -> Self {
        SalesHistory {
            id: Uuid::new_v4().to_string(),
            user_id: cart.user_id().to_string(),
            total_price: cart.total_price(),
            total_vat: cart.total_vat(),
            total_discount: cart.total_discount(),
            sub_total: cart.sub_total(),
            items: cart
                .items()
                .iter()
                .map(|item| SalesHistoryItem {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                })
                .collect(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItem;

    #[test]
    fn test_vat_rate_bands() {
        assert_eq!(VatRate::LOW.percent(), 1);
        assert_eq!(VatRate::STANDARD.percent(), 8);
        assert_eq!(VatRate::HIGH.percent(), 18);
        assert_eq!(VatRate::default(), VatRate::zero());
        assert_eq!(VatRate::HIGH.to_string(), "18%");
    }

    #[test]
    fn test_vat_apply_to() {
        let vat = VatRate::HIGH.apply_to(Money::from_major(50));
        assert_eq!(vat, Money::from_major(9));
    }

    #[test]
    fn test_product_can_sell() {
        let product = Product::new("Tea", Money::from_major(10), VatRate::STANDARD, 3);
        assert!(product.can_sell(3));
        assert!(!product.can_sell(4));
    }

    #[test]
    fn test_sales_history_from_cart() {
        let mut cart = ShoppingCart::new("user-1");
        cart.add_item(CartItem::new("p-1", "Tea", 2, Money::from_major(10), VatRate::STANDARD))
            .unwrap();
        cart.apply_discount(Money::from_major(1)).unwrap();

        let history = SalesHistory::from_cart(&cart);

        assert_eq!(history.user_id, "user-1");
        assert_eq!(history.total_price, Money::from_major(20));
        assert_eq!(history.total_vat, Money::from_minor(160));
        assert_eq!(history.total_discount, Money::from_major(1));
        assert_eq!(history.sub_total, Money::from_minor(2060));
        assert_eq!(
            history.items,
            vec![SalesHistoryItem {
                product_id: "p-1".to_string(),
                quantity: 2
            }]
        );
    }
}
