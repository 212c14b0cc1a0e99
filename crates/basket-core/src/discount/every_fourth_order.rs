//! Reward on every fourth order in the 30-day window.
//!
//! ```text
//! threshold >= last-four-orders total ──► 0
//! otherwise, per line:
//!   VAT  8% ──► line_total × 10%
//!   VAT 18% ──► line_total × 15%
//!   other   ──► 0
//! ```

use crate::cart::{CartItem, ShoppingCart};
use crate::money::Money;
use crate::types::VatRate;

/// Discount on lines in the standard (8%) VAT band.
pub const STANDARD_BAND_PERCENT: u32 = 10;

/// Discount on lines in the high (18%) VAT band.
pub const HIGH_BAND_PERCENT: u32 = 15;

pub fn score(cart: &ShoppingCart, threshold: Money, last_fourth_order_amount: Money) -> Money {
    if threshold >= last_fourth_order_amount {
        return Money::zero();
    }

    cart.items().iter().map(line_discount).sum()
}

fn line_discount(item: &CartItem) -> Money {
    let percent = match item.vat_rate {
        VatRate::STANDARD => STANDARD_BAND_PERCENT,
        VatRate::HIGH => HIGH_BAND_PERCENT,
        _ => return Money::zero(),
    };
    item.line_total().percentage(percent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn mixed_cart() -> ShoppingCart {
        let lines = [(1, 10, 1), (2, 10, 1), (3, 10, 8), (4, 50, 8), (5, 50, 18)];
        let mut cart = ShoppingCart::new("user-1");
        for (qty, price, vat) in lines {
            cart.add_item(CartItem::new(
                format!("p{}", qty),
                "Item",
                qty,
                Money::from_major(price),
                VatRate::from_percent(vat),
            ))
            .unwrap();
        }
        cart
    }

    #[test]
    fn test_scores_by_vat_band() {
        // 30 × 10% + 200 × 10% + 250 × 15% = 3 + 20 + 37.5
        let discount = score(&mixed_cart(), Money::from_major(250), Money::from_major(350));
        assert_eq!(discount.amount(), dec!(60.5));
    }

    #[test]
    fn test_threshold_not_exceeded() {
        let discount = score(&mixed_cart(), Money::from_major(350), Money::from_major(350));
        assert!(discount.is_zero());
    }

    #[test]
    fn test_low_band_contributes_nothing() {
        let mut cart = ShoppingCart::new("user-1");
        cart.add_item(CartItem::new("p1", "Item", 10, Money::from_major(10), VatRate::LOW))
            .unwrap();

        let discount = score(&cart, Money::zero(), Money::from_major(1));
        assert!(discount.is_zero());
    }
}
