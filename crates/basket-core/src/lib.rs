//! # basket-core: Pure Pricing Logic for the Basket Engine
//!
//! This crate is the **heart** of the basket engine. It prices a shopping
//! basket, picks the single best discount and keeps the cart totals
//! consistent, all as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Basket Engine Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    basket-service                               │   │
//! │  │    add_item, remove_item, update_item, checkout                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ basket-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │   cart    │  │ discount  │  │ validation│  │   │
//! │  │   │   Money   │  │ CartItem  │  │  rules    │  │  checks   │  │   │
//! │  │   │  VatRate  │  │ Shopping  │  │calculator │  │           │  │   │
//! │  │   └───────────┘  │   Cart    │  └───────────┘  └───────────┘  │   │
//! │  │                  └───────────┘                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    basket-db (Database Layer)                   │   │
//! │  │      catalog, baskets, sales history, 30-day aggregates         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type over exact decimals (no floating point!)
//! - [`types`] - Domain types (Product, VatRate, SalesHistory)
//! - [`cart`] - ShoppingCart and CartItem with the totals invariant
//! - [`discount`] - Discount rules and the best-discount calculator
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use basket_core::cart::{CartItem, ShoppingCart};
//! use basket_core::discount::{select_discount, DiscountRule};
//! use basket_core::{Money, VatRate};
//!
//! let mut cart = ShoppingCart::new("user-1");
//! let item = CartItem::new("p-1", "Tea", 5, Money::from_major(10), VatRate::zero());
//! cart.add_item(item).unwrap();
//!
//! // 2 units over the 3-unit threshold, 8% of 10 each
//! let discount = select_discount(&cart, &[DiscountRule::SameProduct]);
//! cart.apply_discount(discount).unwrap();
//!
//! assert_eq!(cart.total_discount(), Money::from_minor(160));
//! assert_eq!(cart.sub_total(), Money::from_minor(4840));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod discount;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{CartItem, ShoppingCart};
pub use discount::{
    select_discount, CustomerAggregates, DiscountCalculator, DiscountKind, DiscountPolicy,
    DiscountRule,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Length of the trailing window used for historical aggregates, in days.
///
/// ## Business Reason
/// The monthly-spend campaign looks at the customer's orders from the last
/// 30 days; the every-fourth-order campaign looks at every order placed in
/// the same window.
pub const AGGREGATE_WINDOW_DAYS: i64 = 30;

/// Maximum quantity of a single basket line.
pub const MAX_ITEM_QUANTITY: i64 = 1_000_000;

/// Maximum unit price, in major currency units.
///
/// Together with [`MAX_ITEM_QUANTITY`] this keeps every line total and
/// discount score far inside the range of the underlying decimal.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000;

/// Number of decimal places kept on a persisted currency amount.
pub const CURRENCY_DECIMALS: u32 = 2;
