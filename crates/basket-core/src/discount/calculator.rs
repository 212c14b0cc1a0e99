//! # Discount Calculator
//!
//! Evaluates every configured rule against a cart and keeps the best one.
//! Campaigns never stack: the result is `max(scores)`, or zero when no
//! rules are configured. The amount is returned unrounded; rounding happens
//! in [`ShoppingCart::apply_discount`].

use crate::cart::ShoppingCart;
use crate::discount::{DiscountKind, DiscountRule};
use crate::money::Money;

/// Picks the single best discount from a set of rules.
///
/// ## Example
/// ```rust
/// use basket_core::discount::{DiscountCalculator, DiscountRule};
/// use basket_core::ShoppingCart;
///
/// let calculator = DiscountCalculator::new(vec![DiscountRule::SameProduct]);
/// let cart = ShoppingCart::new("user-1");
/// assert!(calculator.calculate(&cart).is_zero());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscountCalculator {
    rules: Vec<DiscountRule>,
}

impl DiscountCalculator {
    pub fn new(rules: Vec<DiscountRule>) -> Self {
        DiscountCalculator { rules }
    }

    pub fn rules(&self) -> &[DiscountRule] {
        &self.rules
    }

    /// Highest score over all rules; zero for an empty rule list.
    pub fn calculate(&self, cart: &ShoppingCart) -> Money {
        self.best_rule(cart)
            .map(|(_, amount)| amount)
            .unwrap_or_default()
    }

    /// The winning rule and its score.
    ///
    /// Ties go to the rule listed first. `None` only when no rules are
    /// configured.
    pub fn best_rule(&self, cart: &ShoppingCart) -> Option<(DiscountKind, Money)> {
        self.rules
            .iter()
            .map(|rule| (rule.kind(), rule.score(cart)))
            .fold(None, |best, candidate| match best {
                Some((_, amount)) if amount >= candidate.1 => best,
                _ => Some(candidate),
            })
    }
}

/// Returns the best discount for `cart` under `rules`.
pub fn select_discount(cart: &ShoppingCart, rules: &[DiscountRule]) -> Money {
    DiscountCalculator::new(rules.to_vec()).calculate(cart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItem;
    use crate::types::VatRate;
    use rust_decimal_macros::dec;

    /// qty 1..=5 at 10 each, no VAT: total price 150
    fn five_lines() -> ShoppingCart {
        let mut cart = ShoppingCart::new("user-1");
        for qty in 1..=5 {
            cart.add_item(CartItem::new(
                format!("p{}", qty),
                "Item",
                qty,
                Money::from_major(10),
                VatRate::zero(),
            ))
            .unwrap();
        }
        cart
    }

    #[test]
    fn test_empty_rule_list_is_zero() {
        let cart = five_lines();
        assert!(select_discount(&cart, &[]).is_zero());
        assert!(DiscountCalculator::default().calculate(&cart).is_zero());
        assert!(DiscountCalculator::default().best_rule(&cart).is_none());
    }

    #[test]
    fn test_same_product_only() {
        let cart = five_lines();
        let discount = select_discount(&cart, &[DiscountRule::SameProduct]);
        assert_eq!(discount.amount(), dec!(2.4));
    }

    #[test]
    fn test_picks_max_never_sum() {
        let cart = five_lines();
        let rules = vec![
            DiscountRule::SameProduct,
            DiscountRule::PurchaseAmount {
                threshold: Money::from_major(100),
                customer_monthly_spend: Money::from_major(150),
            },
        ];

        // same product 2.4, purchase amount 15
        let calculator = DiscountCalculator::new(rules.clone());
        assert_eq!(calculator.calculate(&five_lines()), Money::from_major(15));
        assert_eq!(select_discount(&cart, &rules), Money::from_major(15));
        assert_eq!(
            calculator.best_rule(&cart),
            Some((DiscountKind::PurchaseAmount, Money::from_major(15)))
        );
    }

    #[test]
    fn test_best_rule_reports_winner() {
        let cart = five_lines();
        let calculator = DiscountCalculator::new(vec![
            DiscountRule::EveryFourthOrder {
                threshold: Money::from_major(10),
                last_fourth_order_amount: Money::zero(),
            },
            DiscountRule::SameProduct,
            DiscountRule::PurchaseAmount {
                threshold: Money::from_major(10),
                customer_monthly_spend: Money::zero(),
            },
        ]);

        let (kind, amount) = calculator.best_rule(&cart).unwrap();
        assert_eq!(kind, DiscountKind::SameProduct);
        assert_eq!(amount.amount(), dec!(2.4));
    }

    #[test]
    fn test_apply_selected_discount_twice_changes_nothing() {
        let mut cart = five_lines();
        let rules = [DiscountRule::SameProduct];

        let discount = select_discount(&cart, &rules);
        cart.apply_discount(discount).unwrap();
        let first = cart.clone();

        let again = select_discount(&cart, &rules);
        cart.apply_discount(again).unwrap();

        assert_eq!(cart.total_discount(), first.total_discount());
        assert_eq!(cart.sub_total(), first.sub_total());
        assert_eq!(cart.sub_total().amount(), dec!(147.6));
    }
}
