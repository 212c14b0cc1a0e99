//! # Shopping Cart
//!
//! The basket and its line items, plus the totals invariant.
//!
//! ## Totals Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  After EVERY mutation the four derived fields satisfy:                  │
//! │                                                                         │
//! │    total_price    = Σ unit_price × quantity                             │
//! │    total_vat      = Σ unit_price × quantity × vat_rate / 100            │
//! │    total_discount = last amount passed to apply_discount (2 dp)         │
//! │    sub_total      = total_price + total_vat - total_discount            │
//! │                                                                         │
//! │  The fields are private. Nothing outside this module can edit them,    │
//! │  and every mutator ends with recompute().                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation                  Item Change              Totals             │
//! │  ─────────                  ───────────              ──────             │
//! │  add_item(item)        ───► items.push(item)    ───► recompute          │
//! │  update_item_quantity  ───► items[i].qty = n    ───► recompute          │
//! │  remove_item(pid)      ───► items.remove(i)     ───► recompute          │
//! │  apply_discount(d)     ───► (none)              ───► discount, subtotal │
//! │  clear()               ───► items.clear()       ───► all zero           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Product, VatRate};
use crate::validation::{validate_quantity, validate_unit_price};

// =============================================================================
// Cart Item
// =============================================================================

/// A priced line in a basket.
///
/// ## Design Notes
/// - `product_name`, `unit_price` and `vat_rate` are frozen when the item
///   is added. Later catalog changes do not reprice the basket.
/// - Only `quantity` changes after creation, through
///   [`ShoppingCart::update_item_quantity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Line id (UUID v4)
    pub id: String,

    /// Catalog product this line refers to
    pub product_id: String,

    /// Product name at time of adding (frozen)
    pub product_name: String,

    /// Units in the basket, always >= 1
    pub quantity: i64,

    /// Price of one unit at time of adding (frozen)
    pub unit_price: Money,

    /// VAT band at time of adding (frozen)
    pub vat_rate: VatRate,

    /// When this item was added to the basket
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a new line with a fresh id.
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
        vat_rate: VatRate,
    ) -> Self {
        CartItem {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
            vat_rate,
            added_at: Utc::now(),
        }
    }

    /// Creates a line from a catalog product, freezing its price and VAT.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem::new(
            product.id.clone(),
            product.name.clone(),
            quantity,
            product.unit_price,
            product.vat_rate,
        )
    }

    /// Line total before VAT (unit price × quantity).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// VAT for this line, unrounded.
    pub fn vat_amount(&self) -> Money {
        self.vat_rate.apply_to(self.line_total())
    }
}

// =============================================================================
// Shopping Cart
// =============================================================================

/// A customer's basket. One per user, created lazily on first access.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding the same product again fails)
/// - Every item has quantity >= 1 and unit price >= 0
/// - Derived totals always match the items (see module docs)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingCart {
    id: String,
    user_id: String,
    items: Vec<CartItem>,
    total_price: Money,
    total_vat: Money,
    total_discount: Money,
    sub_total: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShoppingCart {
    /// Creates an empty basket for `user_id` with all totals at zero.
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        ShoppingCart {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            items: Vec::new(),
            total_price: Money::zero(),
            total_vat: Money::zero(),
            total_discount: Money::zero(),
            sub_total: Money::zero(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a persisted basket.
    ///
    /// Only the discount is taken from storage; the other totals are
    /// recomputed from `items`.
    pub fn restore(
        id: impl Into<String>,
        user_id: impl Into<String>,
        items: Vec<CartItem>,
        total_discount: Money,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut cart = ShoppingCart {
            id: id.into(),
            user_id: user_id.into(),
            items,
            total_price: Money::zero(),
            total_vat: Money::zero(),
            total_discount,
            sub_total: Money::zero(),
            created_at,
            updated_at,
        };
        cart.recompute();
        cart
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn total_vat(&self) -> Money {
        self.total_vat
    }

    pub fn total_discount(&self) -> Money {
        self.total_discount
    }

    pub fn sub_total(&self) -> Money {
        self.sub_total
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Checks whether a line for `product_id` exists.
    pub fn contains_item(&self, product_id: &str) -> bool {
        self.find_item(product_id).is_some()
    }

    /// Returns the line for `product_id`, if present.
    pub fn find_item(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Returns the number of lines in the basket.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity over all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Checks if the basket is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Appends a new line.
    ///
    /// ## Returns
    /// - `Err(DuplicateItem)` if the product is already in the basket
    /// - `Err(InvalidQuantity)` if quantity is outside `1..=MAX_ITEM_QUANTITY`
    /// - `Err(Validation)` if the unit price is negative or above `MAX_UNIT_PRICE`
    pub fn add_item(&mut self, item: CartItem) -> CoreResult<()> {
        if self.contains_item(&item.product_id) {
            return Err(CoreError::DuplicateItem(item.product_id));
        }
        Self::check_quantity(item.quantity)?;
        validate_unit_price(item.unit_price)?;

        self.items.push(item);
        self.touch();
        Ok(())
    }

    /// Removes the line for `product_id`.
    ///
    /// Absent products are a no-op and return `None`.
    pub fn remove_item(&mut self, product_id: &str) -> Option<CartItem> {
        let index = self.items.iter().position(|i| i.product_id == product_id)?;
        let removed = self.items.remove(index);
        self.touch();
        Some(removed)
    }

    /// Replaces the quantity of the line for `product_id`.
    ///
    /// ## Returns
    /// - `Ok(true)` if the line was updated
    /// - `Ok(false)` if the product is not in the basket (no-op)
    /// - `Err(InvalidQuantity)` if `new_quantity` is outside `1..=MAX_ITEM_QUANTITY`
    pub fn update_item_quantity(&mut self, product_id: &str, new_quantity: i64) -> CoreResult<bool> {
        Self::check_quantity(new_quantity)?;

        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = new_quantity;
                self.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Sets the discount and recomputes the sub total.
    ///
    /// The amount is rounded to two decimals (half away from zero) before
    /// it is stored. Applying the same amount twice changes nothing.
    pub fn apply_discount(&mut self, amount: Money) -> CoreResult<()> {
        if amount.is_negative() {
            return Err(CoreError::InvalidDiscount(amount));
        }

        self.total_discount = amount.round_currency();
        self.touch();
        Ok(())
    }

    /// Rejects quantities a basket line cannot hold.
    pub fn check_quantity(quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity).map_err(|_| CoreError::InvalidQuantity(quantity))
    }

    /// Removes every line and resets the discount.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total_discount = Money::zero();
        self.touch();
    }

    /// Recomputes the derived totals from the items. Idempotent.
    pub fn compute_totals(&mut self) {
        self.recompute();
    }

    fn touch(&mut self) {
        self.recompute();
        self.updated_at = Utc::now();
    }

    fn recompute(&mut self) {
        self.total_price = self.items.iter().map(CartItem::line_total).sum();
        self.total_vat = self.items.iter().map(CartItem::vat_amount).sum();
        self.sub_total = self.total_price + self.total_vat - self.total_discount;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn item(product_id: &str, quantity: i64, price: Money, vat: u32) -> CartItem {
        CartItem::new(
            product_id,
            format!("Product {}", product_id),
            quantity,
            price,
            VatRate::from_percent(vat),
        )
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = ShoppingCart::new("user-1");

        assert!(cart.is_empty());
        assert_eq!(cart.user_id(), "user-1");
        assert_eq!(cart.total_price(), Money::zero());
        assert_eq!(cart.sub_total(), Money::zero());
    }

    #[test]
    fn test_add_item_recomputes_totals() {
        let mut cart = ShoppingCart::new("user-1");

        cart.add_item(item("p1", 2, Money::from_major(10), 8)).unwrap();
        cart.add_item(item("p2", 1, Money::from_major(50), 18)).unwrap();

        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.total_price(), Money::from_major(70));
        // 20 × 8% + 50 × 18% = 1.6 + 9
        assert_eq!(cart.total_vat(), Money::from_minor(1060));
        assert_eq!(cart.sub_total(), Money::from_minor(8060));
    }

    #[test]
    fn test_add_duplicate_product_is_rejected() {
        let mut cart = ShoppingCart::new("user-1");
        cart.add_item(item("p1", 2, Money::from_major(10), 8)).unwrap();

        let err = cart
            .add_item(item("p1", 1, Money::from_major(10), 8))
            .unwrap_err();

        assert!(matches!(err, CoreError::DuplicateItem(id) if id == "p1"));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_add_rejects_bad_lines() {
        let mut cart = ShoppingCart::new("user-1");

        let err = cart.add_item(item("p1", 0, Money::from_major(1), 8)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuantity(0)));

        let err = cart
            .add_item(item("p2", 1, Money::from_minor(-1), 8))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_rejects_out_of_range_lines() {
        let mut cart = ShoppingCart::new("user-1");

        let err = cart
            .add_item(item("p1", 1_000_000_000, Money::from_major(100_000_000_000), 18))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuantity(1_000_000_000)));

        let err = cart
            .add_item(item("p2", 1, Money::from_major(100_000_000_000), 18))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        assert!(cart.is_empty());
        assert!(cart.total_price().is_zero());
    }

    #[test]
    fn test_largest_line_prices_without_overflow() {
        let mut cart = ShoppingCart::new("user-1");
        let price = Money::from_major(crate::MAX_UNIT_PRICE);

        cart.add_item(item("p1", crate::MAX_ITEM_QUANTITY, price, 18)).unwrap();

        assert_eq!(cart.total_price(), Money::from_major(1_000_000_000_000_000));
        assert_eq!(cart.total_vat(), Money::from_major(180_000_000_000_000));
    }

    #[test]
    fn test_remove_item() {
        let mut cart = ShoppingCart::new("user-1");
        cart.add_item(item("p1", 2, Money::from_major(10), 0)).unwrap();
        cart.add_item(item("p2", 1, Money::from_major(5), 0)).unwrap();

        let removed = cart.remove_item("p1").unwrap();

        assert_eq!(removed.product_id, "p1");
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_price(), Money::from_major(5));
    }

    #[test]
    fn test_remove_absent_item_is_noop() {
        let mut cart = ShoppingCart::new("user-1");
        cart.add_item(item("p1", 2, Money::from_major(10), 8)).unwrap();
        let before = cart.clone();

        assert!(cart.remove_item("missing").is_none());
        assert_eq!(cart.items(), before.items());
        assert_eq!(cart.sub_total(), before.sub_total());
    }

    #[test]
    fn test_update_item_quantity() {
        let mut cart = ShoppingCart::new("user-1");
        cart.add_item(item("p1", 2, Money::from_major(10), 8)).unwrap();

        assert!(cart.update_item_quantity("p1", 5).unwrap());
        assert_eq!(cart.find_item("p1").map(|i| i.quantity), Some(5));
        assert_eq!(cart.total_price(), Money::from_major(50));
        assert_eq!(cart.total_vat(), Money::from_major(4));

        assert!(!cart.update_item_quantity("missing", 3).unwrap());
    }

    #[test]
    fn test_update_item_quantity_rejects_zero() {
        let mut cart = ShoppingCart::new("user-1");
        cart.add_item(item("p1", 2, Money::from_major(10), 8)).unwrap();

        let err = cart.update_item_quantity("p1", 0).unwrap_err();

        assert!(matches!(err, CoreError::InvalidQuantity(0)));
        let err = cart
            .update_item_quantity("p1", crate::MAX_ITEM_QUANTITY + 1)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuantity(_)));
        assert_eq!(cart.find_item("p1").map(|i| i.quantity), Some(2));
    }

    #[test]
    fn test_apply_discount_rounds_and_recomputes() {
        let mut cart = ShoppingCart::new("user-1");
        cart.add_item(item("p1", 1, Money::from_major(100), 0)).unwrap();

        cart.apply_discount(Money::new(dec!(12.345))).unwrap();

        assert_eq!(cart.total_discount().amount(), dec!(12.35));
        assert_eq!(cart.sub_total().amount(), dec!(87.65));
    }

    #[test]
    fn test_apply_negative_discount_is_rejected() {
        let mut cart = ShoppingCart::new("user-1");

        let err = cart.apply_discount(Money::from_minor(-1)).unwrap_err();

        assert!(matches!(err, CoreError::InvalidDiscount(_)));
        assert!(cart.total_discount().is_zero());
    }

    #[test]
    fn test_apply_discount_is_idempotent() {
        let mut cart = ShoppingCart::new("user-1");
        cart.add_item(item("p1", 4, Money::from_major(10), 8)).unwrap();

        cart.apply_discount(Money::from_minor(80)).unwrap();
        let first = cart.clone();
        cart.apply_discount(Money::from_minor(80)).unwrap();

        assert_eq!(cart.total_discount(), first.total_discount());
        assert_eq!(cart.sub_total(), first.sub_total());
    }

    #[test]
    fn test_compute_totals_is_idempotent() {
        let mut cart = ShoppingCart::new("user-1");
        cart.add_item(item("p1", 3, Money::from_minor(333), 18)).unwrap();
        let before = (cart.total_price(), cart.total_vat(), cart.sub_total());

        cart.compute_totals();
        cart.compute_totals();

        assert_eq!(before, (cart.total_price(), cart.total_vat(), cart.sub_total()));
    }

    #[test]
    fn test_clear_resets_discount() {
        let mut cart = ShoppingCart::new("user-1");
        cart.add_item(item("p1", 5, Money::from_major(10), 0)).unwrap();
        cart.apply_discount(Money::from_minor(160)).unwrap();

        cart.clear();

        assert!(cart.is_empty());
        assert!(cart.total_discount().is_zero());
        assert!(cart.sub_total().is_zero());
    }

    #[test]
    fn test_restore_recomputes_from_items() {
        let items = vec![
            item("p1", 2, Money::from_major(10), 8),
            item("p2", 1, Money::from_major(50), 18),
        ];
        let now = Utc::now();

        let cart = ShoppingCart::restore("cart-1", "user-1", items, Money::from_major(5), now, now);

        assert_eq!(cart.id(), "cart-1");
        assert_eq!(cart.total_price(), Money::from_major(70));
        assert_eq!(cart.total_discount(), Money::from_major(5));
        assert_eq!(cart.sub_total(), Money::from_minor(7560));
    }

    #[test]
    fn test_serializes_camel_case_totals() {
        let mut cart = ShoppingCart::new("user-1");
        cart.add_item(item("p1", 1, Money::from_major(10), 8)).unwrap();

        let json = serde_json::to_value(&cart).unwrap();

        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["totalPrice"], "10");
        assert_eq!(json["items"][0]["productId"], "p1");
    }

    // -------------------------------------------------------------------------
    // Property: totals invariant holds after any sequence of operations
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone)]
    enum Op {
        Add { product: u8, qty: i64, cents: i64, vat: u32 },
        Remove { product: u8 },
        Update { product: u8, qty: i64 },
        Discount { cents: i64 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let vat = prop::sample::select(vec![0u32, 1, 8, 18]);
        prop_oneof![
            (0u8..6, 1i64..20, 0i64..100_000, vat)
                .prop_map(|(product, qty, cents, vat)| Op::Add { product, qty, cents, vat }),
            (0u8..6).prop_map(|product| Op::Remove { product }),
            (0u8..6, 1i64..20).prop_map(|(product, qty)| Op::Update { product, qty }),
            (0i64..5_000).prop_map(|cents| Op::Discount { cents }),
        ]
    }

    proptest! {
        #[test]
        fn prop_totals_match_items(ops in prop::collection::vec(op_strategy(), 0..40)) {
            let mut cart = ShoppingCart::new("prop-user");

            for op in ops {
                match op {
                    Op::Add { product, qty, cents, vat } => {
                        let _ = cart.add_item(item(&format!("p{product}"), qty, Money::from_minor(cents), vat));
                    }
                    Op::Remove { product } => {
                        cart.remove_item(&format!("p{product}"));
                    }
                    Op::Update { product, qty } => {
                        cart.update_item_quantity(&format!("p{product}"), qty).unwrap();
                    }
                    Op::Discount { cents } => {
                        cart.apply_discount(Money::from_minor(cents)).unwrap();
                    }
                }

                let expected_price: Money = cart
                    .items()
                    .iter()
                    .map(|i| i.unit_price * i.quantity)
                    .sum();
                let expected_vat: Money = cart
                    .items()
                    .iter()
                    .map(|i| (i.unit_price * i.quantity).percentage(i.vat_rate.percent()))
                    .sum();

                prop_assert_eq!(cart.total_price(), expected_price);
                prop_assert_eq!(cart.total_vat(), expected_vat);
                prop_assert_eq!(
                    cart.sub_total(),
                    cart.total_price() + cart.total_vat() - cart.total_discount()
                );
                prop_assert!(cart.items().iter().all(|i| i.quantity >= 1));
            }
        }
    }
}
