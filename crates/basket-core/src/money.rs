//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Discounts multiply prices by 8%, 10% and 15%:                         │
//! │    10.00 × 0.08 × 2 must be exactly 1.60, every time                   │
//! │                                                                         │
//! │  OUR SOLUTION: base-10 Decimal                                          │
//! │    Intermediate sums keep full precision                               │
//! │    Rounding to cents happens once, when a discount is applied          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use basket_core::money::Money;
//!
//! let price = Money::from_minor(1099); // 10.99
//!
//! let doubled = price * 2;                       // 21.98
//! let total = price + Money::from_minor(500);    // 15.99
//! assert_eq!(total.to_string(), "15.99");
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;

use crate::CURRENCY_DECIMALS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the major currency unit, backed by an exact decimal.
///
/// ## Design Decisions
/// - **Decimal**: no binary rounding error on prices, VAT or percentages
/// - **Single field tuple struct**: zero-cost wrapper over `Decimal`
/// - **Serde**: serialized as a string (`"10.99"`), never a float
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    Where Money is Used                                  │
/// │                                                                         │
/// │  Product.unit_price ──► CartItem.unit_price ──► CartItem.line_total     │
/// │                                                     │                   │
/// │                                                     ▼                   │
/// │  Cart.total_price + Cart.total_vat - Cart.total_discount = sub_total   │
/// │                                                     │                   │
/// │                                                     ▼                   │
/// │                              SalesHistory.sub_total ──► aggregates     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from whole major units.
    ///
    /// ## Example
    /// ```rust
    /// use basket_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(10).to_string(), "10.00");
    /// ```
    #[inline]
    pub fn from_major(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Creates a Money value from minor units (cents).
    ///
    /// ## Example
    /// ```rust
    /// use basket_core::money::Money;
    ///
    /// let price = Money::from_minor(1099);
    /// assert_eq!(price.to_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_minor(cents: i64) -> Self {
        Money(Decimal::new(cents, CURRENCY_DECIMALS))
    }

    /// Returns the underlying decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use basket_core::money::Money;
    ///
    /// let unit_price = Money::from_minor(299);
    /// assert_eq!(unit_price.multiply_quantity(3), Money::from_minor(897));
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * Decimal::from(qty))
    }

    /// Returns `percent`% of this amount at full precision.
    ///
    /// ## Example
    /// ```rust
    /// use basket_core::money::Money;
    ///
    /// let line = Money::from_major(250);
    /// assert_eq!(line.percentage(15), Money::from_minor(3750));
    /// ```
    ///
    /// No rounding happens here. VAT and discount scores stay exact until
    /// the cart applies a discount.
    #[inline]
    pub fn percentage(&self, percent: u32) -> Money {
        Money(self.0 * Decimal::from(percent) / Decimal::ONE_HUNDRED)
    }

    /// Rounds to two decimal places, half away from zero.
    ///
    /// ## Rounding Explained
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  MIDPOINT AWAY FROM ZERO                                            │
    /// │                                                                     │
    /// │    2.345 → 2.35      2.344 → 2.34      -2.345 → -2.35              │
    /// │                                                                     │
    /// │  Called once per discount application. Totals derived from items   │
    /// │  are never rounded.                                                │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use basket_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let raw = Money::new(Decimal::new(2345, 3)); // 2.345
    /// assert_eq!(raw.round_currency(), Money::from_minor(235));
    /// ```
    pub fn round_currency(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(CURRENCY_DECIMALS, RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount with exactly two decimals (`"10.99"`).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.round_currency().0)
    }
}

/// Parses a decimal string such as `"10.99"` (used for stored amounts).
impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
