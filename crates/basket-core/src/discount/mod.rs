//! # Discount Module
//!
//! Competing discount campaigns and the calculator that picks one winner.
//!
//! ## How a Discount Is Chosen
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Best-Discount Selection                               │
//! │                                                                         │
//! │  CustomerAggregates ──┐                                                 │
//! │  (30-day spend,       │   DiscountPolicy::rules_for()                   │
//! │   4th-order total)    ├──────────────────────────► [rules]              │
//! │  threshold ───────────┘                               │                 │
//! │                                                       ▼                 │
//! │   ┌────────────────┐  ┌────────────────┐  ┌──────────────────────┐     │
//! │   │  SameProduct   │  │ PurchaseAmount │  │  EveryFourthOrder    │     │
//! │   │  score = 2.40  │  │  score = 0.00  │  │  score = 0.00        │     │
//! │   └───────┬────────┘  └───────┬────────┘  └──────────┬───────────┘     │
//! │           └───────────────────┼──────────────────────┘                 │
//! │                               ▼                                         │
//! │                 DiscountCalculator: max(scores)                         │
//! │                 (never the sum: campaigns do not stack)                 │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                 cart.apply_discount(2.40)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every rule is a pure function of the cart and its own parameters.

pub mod calculator;
pub mod every_fourth_order;
pub mod purchase_amount;
pub mod same_product;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cart::ShoppingCart;
use crate::money::Money;

pub use calculator::{select_discount, DiscountCalculator};

// =============================================================================
// Discount Rule
// =============================================================================

/// A discount campaign, one variant per rule kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountRule {
    /// 8% off every unit beyond the third of the same product.
    SameProduct,

    /// 10% off the pre-VAT total once the customer's 30-day spend is above
    /// the threshold.
    PurchaseAmount {
        threshold: Money,
        customer_monthly_spend: Money,
    },

    /// 10% off 8%-VAT lines and 15% off 18%-VAT lines once the customer's
    /// last-four-orders total is above the threshold.
    EveryFourthOrder {
        threshold: Money,
        last_fourth_order_amount: Money,
    },
}

impl DiscountRule {
    /// Scores the cart. Always >= 0, never rounded.
    pub fn score(&self, cart: &ShoppingCart) -> Money {
        match *self {
            DiscountRule::SameProduct => same_product::score(cart),
            DiscountRule::PurchaseAmount {
                threshold,
                customer_monthly_spend,
            } => purchase_amount::score(cart, threshold, customer_monthly_spend),
            DiscountRule::EveryFourthOrder {
                threshold,
                last_fourth_order_amount,
            } => every_fourth_order::score(cart, threshold, last_fourth_order_amount),
        }
    }

    /// Which campaign this rule belongs to.
    pub fn kind(&self) -> DiscountKind {
        match self {
            DiscountRule::SameProduct => DiscountKind::SameProduct,
            DiscountRule::PurchaseAmount { .. } => DiscountKind::PurchaseAmount,
            DiscountRule::EveryFourthOrder { .. } => DiscountKind::EveryFourthOrder,
        }
    }
}

/// Campaign identifier, used when reporting which rule won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    SameProduct,
    PurchaseAmount,
    EveryFourthOrder,
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiscountKind::SameProduct => "same_product",
            DiscountKind::PurchaseAmount => "purchase_amount",
            DiscountKind::EveryFourthOrder => "every_fourth_order",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Rule Inputs
// =============================================================================

/// Historical amounts used to price one customer's basket, fetched by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAggregates {
    /// Σ sub_total of the customer's orders in the last 30 days.
    pub monthly_spend: Money,

    /// Σ sub_total of the store's last four orders when the 30-day order
    /// count over all customers is a multiple of four, otherwise zero.
    pub last_fourth_order_amount: Money,
}

/// Discount configuration shared by every basket.
///
/// ## Threshold
/// The same threshold gates both history-based campaigns. It is fixed when
/// the service is built and never read from the environment while pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    pub threshold: Money,
}

impl DiscountPolicy {
    pub fn new(threshold: Money) -> Self {
        DiscountPolicy { threshold }
    }

    /// Builds the full rule set for one customer.
    ///
    /// ## Example
    /// ```rust
    /// use basket_core::discount::{CustomerAggregates, DiscountPolicy};
    /// use basket_core::Money;
    ///
    /// let policy = DiscountPolicy::new(Money::from_major(100));
    /// let rules = policy.rules_for(&CustomerAggregates::default());
    /// assert_eq!(rules.len(), 3);
    /// ```
    pub fn rules_for(&self, aggregates: &CustomerAggregates) -> Vec<DiscountRule> {
        vec![
            DiscountRule::PurchaseAmount {
                threshold: self.threshold,
                customer_monthly_spend: aggregates.monthly_spend,
            },
            DiscountRule::EveryFourthOrder {
                threshold: self.threshold,
                last_fourth_order_amount: aggregates.last_fourth_order_amount,
            },
            DiscountRule::SameProduct,
        ]
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
