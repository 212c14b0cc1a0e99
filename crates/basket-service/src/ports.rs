//! # Collaborator Traits
//!
//! The service talks to its store through four narrow traits. The SQLite
//! [`Database`] implements all of them; tests swap in mocks.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BasketService                                                          │
//! │     │                                                                   │
//! │     ├── BasketStore           get_or_create, save                      │
//! │     ├── ProductCatalog        get_product, list_products               │
//! │     ├── HistoricalAggregates  customer_monthly_spend,                  │
//! │     │                         last_fourth_order_amount                 │
//! │     └── CheckoutStore         checkout (all-or-nothing)                │
//! │                                                                         │
//! │  impl for basket_db::Database ─► repositories ─► SQLite               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use basket_core::{Money, Product, SalesHistory, ShoppingCart};
use basket_db::Database;
use chrono::{DateTime, Utc};

use crate::error::ServiceResult;

/// Persistent one-per-user baskets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BasketStore: Send + Sync {
    /// Loads the user's basket, creating an empty one on a miss.
    async fn get_or_create(&self, user_id: &str) -> ServiceResult<ShoppingCart>;

    async fn save(&self, cart: &ShoppingCart) -> ServiceResult<()>;
}

/// Read access to the product catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, product_id: &str) -> ServiceResult<Option<Product>>;

    async fn list_products(&self) -> ServiceResult<Vec<Product>>;
}

/// Trailing-window purchase history numbers the discount rules need.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoricalAggregates: Send + Sync {
    async fn customer_monthly_spend(&self, user_id: &str, now: DateTime<Utc>) -> ServiceResult<Money>;

    /// Store-wide: counts every user's orders in the window.
    async fn last_fourth_order_amount(&self, now: DateTime<Utc>) -> ServiceResult<Money>;
}

/// Turns a priced basket into a sales history record.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Decrements stock, records the sale and deletes the basket as one
    /// unit. Insufficient stock on any line rejects the whole checkout.
    async fn checkout(&self, cart: &ShoppingCart) -> ServiceResult<SalesHistory>;
}

// =============================================================================
// SQLite Implementations
// =============================================================================

#[async_trait]
impl BasketStore for Database {
    async fn get_or_create(&self, user_id: &str) -> ServiceResult<ShoppingCart> {
        Ok(self.baskets().get_or_create(user_id).await?)
    }

    async fn save(&self, cart: &ShoppingCart) -> ServiceResult<()> {
        Ok(self.baskets().save(cart).await?)
    }
}

#[async_trait]
impl ProductCatalog for Database {
    async fn get_product(&self, product_id: &str) -> ServiceResult<Option<Product>> {
        Ok(self.products().get_by_id(product_id).await?)
    }

    async fn list_products(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.products().list().await?)
    }
}

#[async_trait]
impl HistoricalAggregates for Database {
    async fn customer_monthly_spend(&self, user_id: &str, now: DateTime<Utc>) -> ServiceResult<Money> {
        Ok(self.sales().customer_monthly_spend(user_id, now).await?)
    }

    async fn last_fourth_order_amount(&self, now: DateTime<Utc>) -> ServiceResult<Money> {
        Ok(self.sales().last_fourth_order_amount(now).await?)
    }
}

#[async_trait]
impl CheckoutStore for Database {
    async fn checkout(&self, cart: &ShoppingCart) -> ServiceResult<SalesHistory> {
        Ok(self.sales().checkout(cart).await?)
    }
}

/// The four collaborators a [`BasketService`](crate::BasketService) needs.
#[derive(Clone)]
pub struct Ports {
    pub baskets: Arc<dyn BasketStore>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub aggregates: Arc<dyn HistoricalAggregates>,
    pub checkout: Arc<dyn CheckoutStore>,
}

impl Ports {
    /// Backs every port with the same database.
    pub fn from_database(db: Database) -> Self {
        let db = Arc::new(db);
        Ports {
            baskets: db.clone(),
            catalog: db.clone(),
            aggregates: db.clone(),
            checkout: db,
        }
    }

    /// Replaces the aggregate provider, keeping the other ports.
    pub fn with_aggregates(mut self, aggregates: Arc<dyn HistoricalAggregates>) -> Self {
        self.aggregates = aggregates;
        self
    }
}
