//! # Basket Service
//!
//! The integrating layer: every operation is one fetch → mutate → price →
//! persist sequence, run under the basket's lock.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    add_item / update_item / remove_item                 │
//! │                                                                         │
//! │  locks.acquire(user_id)                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  baskets.get_or_create ──► validate against cart + catalog              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cart.add_item / update_item_quantity / remove_item  (totals recomputed)│
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  reprice:                                                               │
//! │    aggregates (monthly spend, last fourth order) ── failure policy      │
//! │    DiscountPolicy::rules_for ──► DiscountCalculator::best_rule          │
//! │    cart.apply_discount(best)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  baskets.save ──► guard dropped                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Checkout re-prices the basket and hands it to the checkout store, which
//! writes history, moves stock and deletes the basket in one transaction.

use basket_core::validation::validate_user_id;
use basket_core::{
    CartItem, CoreError, CustomerAggregates, DiscountCalculator, DiscountPolicy, Money, Product,
    SalesHistory, ShoppingCart,
};
use basket_db::pool::IN_MEMORY_PATH;
use basket_db::{Database, DbConfig};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::{AggregateFailurePolicy, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::locks::BasketLocks;
use crate::ports::Ports;

/// Basket operations over a set of [`Ports`].
pub struct BasketService {
    ports: Ports,
    discount: DiscountPolicy,
    aggregate_failure: AggregateFailurePolicy,
    locks: BasketLocks,
}

impl BasketService {
    pub fn new(
        ports: Ports,
        discount: DiscountPolicy,
        aggregate_failure: AggregateFailurePolicy,
    ) -> Self {
        BasketService {
            ports,
            discount,
            aggregate_failure,
            locks: BasketLocks::new(),
        }
    }

    /// Builds a service with every port backed by `db`.
    pub fn from_database(db: Database, config: &ServiceConfig) -> Self {
        Self::new(
            Ports::from_database(db),
            config.discount,
            config.aggregate_failure,
        )
    }

    /// Opens (and migrates) the configured database, then builds the service.
    pub async fn connect(config: &ServiceConfig) -> ServiceResult<Self> {
        let db_config = if config.database_path.as_os_str() == IN_MEMORY_PATH {
            DbConfig::in_memory()
        } else {
            DbConfig::new(config.database_path.clone())
        };
        let db = Database::new(db_config).await?;

        info!(
            threshold = %config.discount.threshold,
            aggregate_failure = %config.aggregate_failure,
            "Basket service ready"
        );
        Ok(Self::from_database(db, config))
    }

    pub fn discount_policy(&self) -> DiscountPolicy {
        self.discount
    }

    pub fn aggregate_failure_policy(&self) -> AggregateFailurePolicy {
        self.aggregate_failure
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Lists the catalog.
    pub async fn list_products(&self) -> ServiceResult<Vec<Product>> {
        self.ports.catalog.list_products().await
    }

    /// Returns the user's basket as stored, creating it on first access.
    pub async fn get_basket(&self, user_id: &str) -> ServiceResult<ShoppingCart> {
        validate_user_id(user_id).map_err(CoreError::from)?;
        self.ports.baskets.get_or_create(user_id).await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds `quantity` units of a catalog product to the basket.
    ///
    /// ## Errors
    /// * `INVALID_QUANTITY` - quantity below 1 or above `MAX_ITEM_QUANTITY`
    /// * `DUPLICATE_ITEM` - product already in the basket (use `update_item`)
    /// * `PRODUCT_NOT_FOUND` - product not in the catalog
    /// * `INSUFFICIENT_STOCK` - not enough units in stock
    pub async fn add_item(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> ServiceResult<ShoppingCart> {
        validate_user_id(user_id).map_err(CoreError::from)?;
        ShoppingCart::check_quantity(quantity)?;

        let _guard = self.locks.acquire(user_id).await;
        let mut cart = self.ports.baskets.get_or_create(user_id).await?;

        if cart.contains_item(product_id) {
            return Err(CoreError::DuplicateItem(product_id.to_string()).into());
        }

        let product = self.catalog_product(product_id).await?;
        ensure_stock(&product, quantity)?;

        cart.add_item(CartItem::from_product(&product, quantity))?;
        self.reprice(&mut cart).await?;
        self.ports.baskets.save(&cart).await?;

        debug!(
            user_id = %user_id,
            product_id = %product_id,
            quantity,
            sub_total = %cart.sub_total(),
            "Item added to basket"
        );
        Ok(cart)
    }

    /// Removes a product from the basket.
    pub async fn remove_item(&self, user_id: &str, product_id: &str) -> ServiceResult<ShoppingCart> {
        validate_user_id(user_id).map_err(CoreError::from)?;

        let _guard = self.locks.acquire(user_id).await;
        let mut cart = self.ports.baskets.get_or_create(user_id).await?;

        if cart.remove_item(product_id).is_none() {
            return Err(ServiceError::item_not_found(product_id));
        }

        self.reprice(&mut cart).await?;
        self.ports.baskets.save(&cart).await?;

        debug!(user_id = %user_id, product_id = %product_id, "Item removed from basket");
        Ok(cart)
    }

    /// Sets the quantity of a product already in the basket.
    ///
    /// Stock is checked again against the current catalog row.
    pub async fn update_item(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> ServiceResult<ShoppingCart> {
        validate_user_id(user_id).map_err(CoreError::from)?;
        ShoppingCart::check_quantity(quantity)?;

        let _guard = self.locks.acquire(user_id).await;
        let mut cart = self.ports.baskets.get_or_create(user_id).await?;

        if !cart.contains_item(product_id) {
            return Err(ServiceError::item_not_found(product_id));
        }

        let product = self.catalog_product(product_id).await?;
        ensure_stock(&product, quantity)?;

        cart.update_item_quantity(product_id, quantity)?;
        self.reprice(&mut cart).await?;
        self.ports.baskets.save(&cart).await?;

        debug!(
            user_id = %user_id,
            product_id = %product_id,
            quantity,
            "Basket item quantity updated"
        );
        Ok(cart)
    }

    /// Converts the basket into a sales history record.
    pub async fn checkout(&self, user_id: &str) -> ServiceResult<SalesHistory> {
        validate_user_id(user_id).map_err(CoreError::from)?;

        let _guard = self.locks.acquire(user_id).await;
        let mut cart = self.ports.baskets.get_or_create(user_id).await?;

        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        self.reprice(&mut cart).await?;
        let history = self.ports.checkout.checkout(&cart).await?;

        info!(
            user_id = %user_id,
            sales_id = %history.id,
            sub_total = %history.sub_total,
            discount = %history.total_discount,
            "Basket checked out"
        );
        Ok(history)
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// Recomputes the winning discount for `cart` and applies it.
    async fn reprice(&self, cart: &mut ShoppingCart) -> ServiceResult<()> {
        let aggregates = self.load_aggregates(cart.user_id(), Utc::now()).await?;
        let calculator = DiscountCalculator::new(self.discount.rules_for(&aggregates));

        let discount = match calculator.best_rule(cart) {
            Some((rule, amount)) if !amount.is_zero() => {
                debug!(
                    cart_id = %cart.id(),
                    rule = %rule,
                    amount = %amount,
                    "Discount rule selected"
                );
                amount
            }
            _ => Money::zero(),
        };

        cart.apply_discount(discount)?;
        Ok(())
    }

    async fn load_aggregates(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<CustomerAggregates> {
        let (monthly_spend, last_fourth_order_amount) = tokio::join!(
            self.ports.aggregates.customer_monthly_spend(user_id, now),
            self.ports.aggregates.last_fourth_order_amount(now),
        );

        Ok(CustomerAggregates {
            monthly_spend: self.resolve_aggregate("customer_monthly_spend", user_id, monthly_spend)?,
            last_fourth_order_amount: self.resolve_aggregate(
                "last_fourth_order_amount",
                user_id,
                last_fourth_order_amount,
            )?,
        })
    }

    fn resolve_aggregate(
        &self,
        aggregate: &str,
        user_id: &str,
        result: ServiceResult<Money>,
    ) -> ServiceResult<Money> {
        match (result, self.aggregate_failure) {
            (Ok(amount), _) => Ok(amount),
            (Err(e), AggregateFailurePolicy::Degrade) => {
                warn!(
                    user_id = %user_id,
                    aggregate = %aggregate,
                    error = %e,
                    "Aggregate lookup failed, pricing without it"
                );
                Ok(Money::zero())
            }
            (Err(e), AggregateFailurePolicy::FailFast) => {
                error!(
                    user_id = %user_id,
                    aggregate = %aggregate,
                    error = %e,
                    "Aggregate lookup failed"
                );
                Err(ServiceError::aggregate_lookup(aggregate, e.message))
            }
        }
    }

    async fn catalog_product(&self, product_id: &str) -> ServiceResult<Product> {
        self.ports
            .catalog
            .get_product(product_id)
            .await?
            .ok_or_else(|| ServiceError::product_not_found(product_id))
    }
}

fn ensure_stock(product: &Product, quantity: i64) -> ServiceResult<()> {
    if product.can_sell(quantity) {
        return Ok(());
    }
    Err(CoreError::InsufficientStock {
        product_id: product.id.clone(),
        available: product.stock_quantity,
        requested: quantity,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::ports::MockHistoricalAggregates;
    use basket_core::{SalesHistoryItem, VatRate};
    use chrono::Duration;
    use std::sync::Arc;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn service(db: &Database, threshold: i64) -> BasketService {
        BasketService::new(
            Ports::from_database(db.clone()),
            DiscountPolicy::new(Money::from_major(threshold)),
            AggregateFailurePolicy::Degrade,
        )
    }

    async fn product(db: &Database, name: &str, price: Money, vat: VatRate, stock: i64) -> Product {
        let product = Product::new(name, price, vat, stock);
        db.products().insert(&product).await.unwrap()
    }

    async fn past_order(db: &Database, user_id: &str, sub_total: Money, days_ago: i64) {
        let history = SalesHistory {
            id: format!("order-{}-{}", user_id, days_ago),
            user_id: user_id.to_string(),
            total_price: sub_total,
            total_vat: Money::zero(),
            total_discount: Money::zero(),
            sub_total,
            items: vec![SalesHistoryItem {
                product_id: "past".to_string(),
                quantity: 1,
            }],
            created_at: Utc::now() - Duration::days(days_ago),
        };
        db.sales().insert_history(&history).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_basket_creates_empty() {
        let db = db().await;
        let svc = service(&db, 0);

        let cart = svc.get_basket("user-1").await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(cart.sub_total(), Money::zero());

        let err = svc.get_basket("").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_add_item_prices_and_persists() {
        let db = db().await;
        let svc = service(&db, 0);
        let tea = product(&db, "Tea", Money::from_major(10), VatRate::STANDARD, 10).await;

        let cart = svc.add_item("user-1", &tea.id, 4).await.unwrap();

        // SameProduct: 10 × (4 - 3) × 8% = 0.80
        assert_eq!(cart.total_price(), Money::from_major(40));
        assert_eq!(cart.total_vat(), Money::from_minor(320));
        assert_eq!(cart.total_discount(), Money::from_minor(80));
        assert_eq!(cart.sub_total(), Money::from_minor(4240));

        let stored = svc.get_basket("user-1").await.unwrap();
        assert_eq!(stored.items(), cart.items());
        assert_eq!(stored.total_discount(), Money::from_minor(80));
    }

    #[tokio::test]
    async fn test_add_item_rejections() {
        let db = db().await;
        let svc = service(&db, 0);
        let tea = product(&db, "Tea", Money::from_major(10), VatRate::STANDARD, 3).await;

        let err = svc.add_item("user-1", &tea.id, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);

        let err = svc.add_item("user-1", &tea.id, 1_000_000_000).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);

        let err = svc.add_item("user-1", "missing", 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductNotFound);

        let err = svc.add_item("user-1", &tea.id, 5).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        svc.add_item("user-1", &tea.id, 1).await.unwrap();
        let err = svc.add_item("user-1", &tea.id, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateItem);

        let cart = svc.get_basket("user-1").await.unwrap();
        assert_eq!(cart.item_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_item_reprices() {
        let db = db().await;
        let svc = service(&db, 0);
        let tea = product(&db, "Tea", Money::from_major(10), VatRate::STANDARD, 10).await;
        let milk = product(&db, "Milk", Money::from_major(2), VatRate::LOW, 10).await;

        svc.add_item("user-1", &tea.id, 4).await.unwrap();
        svc.add_item("user-1", &milk.id, 1).await.unwrap();

        let cart = svc.remove_item("user-1", &tea.id).await.unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_discount(), Money::zero());
        assert_eq!(cart.sub_total(), Money::from_minor(202));

        let err = svc.remove_item("user-1", &tea.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ItemNotFound);
    }

    #[tokio::test]
    async fn test_update_item() {
        let db = db().await;
        let svc = service(&db, 0);
        let tea = product(&db, "Tea", Money::from_major(10), VatRate::STANDARD, 6).await;

        let err = svc.update_item("user-1", &tea.id, 2).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ItemNotFound);

        svc.add_item("user-1", &tea.id, 1).await.unwrap();
        let cart = svc.update_item("user-1", &tea.id, 5).await.unwrap();

        // SameProduct: 10 × 2 × 8% = 1.60
        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.total_discount(), Money::from_minor(160));

        let err = svc.update_item("user-1", &tea.id, 7).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let err = svc.update_item("user-1", &tea.id, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);
    }

    #[tokio::test]
    async fn test_purchase_amount_rule_uses_history() {
        let db = db().await;
        let svc = service(&db, 100);
        let tv = product(&db, "Radio", Money::from_major(510), VatRate::LOW, 1).await;
        past_order(&db, "user-1", Money::from_major(150), 3).await;

        let cart = svc.add_item("user-1", &tv.id, 1).await.unwrap();

        // 150 spent this month > 100: 10% of 510
        assert_eq!(cart.total_discount(), Money::from_major(51));
    }

    #[tokio::test]
    async fn test_every_fourth_order_wins_when_largest() {
        let db = db().await;
        let svc = service(&db, 250);
        for (days_ago, amount) in [(1, 50), (2, 100), (3, 100), (4, 100)] {
            past_order(&db, "user-1", Money::from_major(amount), days_ago).await;
        }

        let lines = [
            (10, VatRate::LOW, 1),
            (10, VatRate::LOW, 2),
            (10, VatRate::STANDARD, 3),
            (50, VatRate::STANDARD, 4),
            (50, VatRate::HIGH, 5),
        ];
        let mut cart = None;
        for (idx, (price, vat, qty)) in lines.into_iter().enumerate() {
            let p = product(&db, &format!("Item {idx}"), Money::from_major(price), vat, 10).await;
            cart = Some(svc.add_item("user-1", &p.id, qty).await.unwrap());
        }
        let cart = cart.unwrap();

        // EveryFourthOrder 60.5 beats PurchaseAmount 51 and SameProduct 12
        assert_eq!(cart.total_price(), Money::from_major(510));
        assert_eq!(cart.total_discount(), Money::from_minor(6050));
    }

    #[tokio::test]
    async fn test_every_fourth_order_counts_other_customers() {
        let db = db().await;
        let svc = service(&db, 250);
        for (user_id, days_ago) in [("user-2", 1), ("user-2", 2), ("user-3", 3), ("user-4", 4)] {
            past_order(&db, user_id, Money::from_major(100), days_ago).await;
        }
        let soap = product(&db, "Soap", Money::from_major(20), VatRate::HIGH, 10).await;

        let cart = svc.add_item("user-1", &soap.id, 1).await.unwrap();

        // user-1 has no history, but the store's last four orders total 400 > 250:
        // 20 × 15% = 3.00
        assert_eq!(cart.total_discount(), Money::from_major(3));
    }

    #[tokio::test]
    async fn test_checkout() {
        let db = db().await;
        let svc = service(&db, 0);
        let tea = product(&db, "Tea", Money::from_major(10), VatRate::STANDARD, 10).await;

        let err = svc.checkout("user-1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyCart);

        svc.add_item("user-1", &tea.id, 4).await.unwrap();
        let history = svc.checkout("user-1").await.unwrap();

        assert_eq!(history.sub_total, Money::from_minor(4240));
        assert_eq!(history.total_discount, Money::from_minor(80));

        let tea = db.products().get_by_id(&tea.id).await.unwrap().unwrap();
        assert_eq!(tea.stock_quantity, 6);
        assert!(svc.get_basket("user-1").await.unwrap().is_empty());
        assert_eq!(
            db.sales().customer_monthly_spend("user-1", Utc::now()).await.unwrap(),
            Money::from_minor(4240)
        );
    }

    #[tokio::test]
    async fn test_checkout_rejects_when_stock_moved() {
        let db = db().await;
        let svc = service(&db, 0);
        let tea = product(&db, "Tea", Money::from_major(10), VatRate::STANDARD, 2).await;
        svc.add_item("user-1", &tea.id, 2).await.unwrap();

        // Someone else buys the last units first
        svc.add_item("user-2", &tea.id, 2).await.unwrap();
        svc.checkout("user-2").await.unwrap();

        let err = svc.checkout("user-1").await.unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(svc.get_basket("user-1").await.unwrap().item_count(), 1);
    }

    #[tokio::test]
    async fn test_degrade_policy_prices_without_failed_aggregate() {
        let db = db().await;
        let tea = product(&db, "Tea", Money::from_major(10), VatRate::STANDARD, 10).await;

        let mut aggregates = MockHistoricalAggregates::new();
        aggregates
            .expect_customer_monthly_spend()
            .returning(|_, _| Err(ServiceError::internal("store unavailable")));
        aggregates
            .expect_last_fourth_order_amount()
            .returning(|_| Ok(Money::zero()));

        let svc = BasketService::new(
            Ports::from_database(db.clone()).with_aggregates(Arc::new(aggregates)),
            DiscountPolicy::new(Money::zero()),
            AggregateFailurePolicy::Degrade,
        );

        let cart = svc.add_item("user-1", &tea.id, 4).await.unwrap();

        assert_eq!(cart.total_discount(), Money::from_minor(80));
    }

    #[tokio::test]
    async fn test_fail_fast_policy_aborts_without_saving() {
        let db = db().await;
        let tea = product(&db, "Tea", Money::from_major(10), VatRate::STANDARD, 10).await;

        let mut aggregates = MockHistoricalAggregates::new();
        aggregates
            .expect_customer_monthly_spend()
            .returning(|_, _| Ok(Money::zero()));
        aggregates
            .expect_last_fourth_order_amount()
            .returning(|_| Err(ServiceError::internal("store unavailable")));

        let svc = BasketService::new(
            Ports::from_database(db.clone()).with_aggregates(Arc::new(aggregates)),
            DiscountPolicy::new(Money::zero()),
            AggregateFailurePolicy::FailFast,
        );

        let err = svc.add_item("user-1", &tea.id, 4).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::AggregateLookupFailed);
        assert!(err.message.contains("last_fourth_order_amount"));
        assert!(svc.get_basket("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_on_one_basket_both_land() {
        let db = db().await;
        let svc = Arc::new(service(&db, 0));
        let tea = product(&db, "Tea", Money::from_major(10), VatRate::STANDARD, 10).await;
        let milk = product(&db, "Milk", Money::from_major(2), VatRate::LOW, 10).await;

        let (a, b) = tokio::join!(
            svc.add_item("user-1", &tea.id, 1),
            svc.add_item("user-1", &milk.id, 1),
        );
        a.unwrap();
        b.unwrap();

        let cart = svc.get_basket("user-1").await.unwrap();
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total_price(), Money::from_major(12));
    }

    #[tokio::test]
    async fn test_connect_in_memory() {
        let config = ServiceConfig {
            database_path: IN_MEMORY_PATH.into(),
            ..ServiceConfig::default()
        };

        let svc = BasketService::connect(&config).await.unwrap();

        assert!(svc.list_products().await.unwrap().is_empty());
        assert_eq!(svc.aggregate_failure_policy(), AggregateFailurePolicy::Degrade);
    }
}
