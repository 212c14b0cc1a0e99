//! Bulk discount on repeated units of the same product.
//!
//! ```text
//! qty ≤ 3  ──► 0
//! qty > 3  ──► unit_price × (qty - 3) × 8%
//! ```

use crate::cart::ShoppingCart;
use crate::money::Money;

/// Units of one product bought at full price before the discount starts.
pub const FREE_UNITS_THRESHOLD: i64 = 3;

/// Percentage taken off each unit beyond the threshold.
pub const DISCOUNT_PERCENT: u32 = 8;

/// Sums the bulk discount over every line of the cart.
pub fn score(cart: &ShoppingCart) -> Money {
    cart.items()
        .iter()
        .filter(|item| item.quantity > FREE_UNITS_THRESHOLD)
        .map(|item| {
            item.unit_price
                .multiply_quantity(item.quantity - FREE_UNITS_THRESHOLD)
                .percentage(DISCOUNT_PERCENT)
        })
        .sum()
}
