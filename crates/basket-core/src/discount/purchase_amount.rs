//! Loyalty discount for customers whose 30-day spend is above the threshold.
//!
//! ```text
//! threshold >= monthly spend ──► 0
//! threshold <  monthly spend ──► total_price × 10%   (pre-VAT)
//! ```

use crate::cart::ShoppingCart;
use crate::money::Money;

/// Percentage taken off the cart's pre-VAT total.
pub const DISCOUNT_PERCENT: u32 = 10;

pub fn score(cart: &ShoppingCart, threshold: Money, customer_monthly_spend: Money) -> Money {
    if threshold >= customer_monthly_spend {
        return Money::zero();
    }

    cart.total_price().percentage(DISCOUNT_PERCENT)
}
