//! # Sales Repository
//!
//! Write-once order history, the two trailing-window aggregates the
//! discount rules need, and the checkout transaction that produces history.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         checkout(cart)                                  │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    for each line:                                                       │
//! │      SELECT stock_quantity ──► missing?      ──► NotFound     (rollback)│
//! │                            ──► stock < qty? ──► InsufficientStock       │
//! │      UPDATE products SET stock_quantity = stock - qty                   │
//! │    INSERT sales_history + sales_history_items                           │
//! │    DELETE shopping_carts (items cascade)                                │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error drops `tx` before COMMIT, which rolls everything back.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Aggregate Window
//! Both aggregates look at records with `now - 30 days < created_at <= now`.
//! Timestamps are stored as RFC 3339 UTC text, which sorts chronologically.

use chrono::{DateTime, Duration, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::parse_money;
use basket_core::{Money, SalesHistory, SalesHistoryItem, ShoppingCart, AGGREGATE_WINDOW_DAYS};

/// Number of orders that make up one "every fourth order" cycle.
pub const ORDER_CYCLE: usize = 4;

#[derive(Debug, sqlx::FromRow)]
struct SalesHistoryRow {
    id: String,
    user_id: String,
    total_price: String,
    total_vat: String,
    total_discount: String,
    sub_total: String,
    created_at: DateTime<Utc>,
}

impl SalesHistoryRow {
    fn into_history(self, items: Vec<SalesHistoryItem>) -> DbResult<SalesHistory> {
        Ok(SalesHistory {
            total_price: parse_money("sales_history.total_price", &self.total_price)?,
            total_vat: parse_money("sales_history.total_vat", &self.total_vat)?,
            total_discount: parse_money("sales_history.total_discount", &self.total_discount)?,
            sub_total: parse_money("sales_history.sub_total", &self.sub_total)?,
            id: self.id,
            user_id: self.user_id,
            items,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SalesHistoryItemRow {
    product_id: String,
    quantity: i64,
}

/// Repository for sales history, aggregates and checkout.
#[derive(Debug, Clone)]
pub struct SalesRepository {
    pool: SqlitePool,
}

impl SalesRepository {
    /// Creates a new SalesRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SalesRepository { pool }
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Sum of `sub_total` over the user's orders in the trailing window.
    pub async fn customer_monthly_spend(&self, user_id: &str, now: DateTime<Utc>) -> DbResult<Money> {
        let sub_totals = self.window_sub_totals(Some(user_id), now).await?;
        let spend: Money = sub_totals.iter().copied().sum();

        debug!(
            user_id = %user_id,
            orders = sub_totals.len(),
            spend = %spend,
            "Computed monthly spend"
        );
        Ok(spend)
    }

    /// Sum of `sub_total` over the last four orders in the trailing window,
    /// across all users, or zero unless the window holds an exact multiple
    /// of four.
    ///
    /// The count is taken before the order being priced is recorded, so the
    /// discount lands on the order that completes the boundary.
    pub async fn last_fourth_order_amount(&self, now: DateTime<Utc>) -> DbResult<Money> {
        let sub_totals = self.window_sub_totals(None, now).await?;

        if sub_totals.is_empty() || sub_totals.len() % ORDER_CYCLE != 0 {
            debug!(orders = sub_totals.len(), "Not on a fourth-order boundary");
            return Ok(Money::zero());
        }

        let amount: Money = sub_totals.iter().take(ORDER_CYCLE).copied().sum();
        debug!(orders = sub_totals.len(), amount = %amount, "Fourth-order boundary reached");
        Ok(amount)
    }

    /// Window sub totals, newest first. `None` covers every user.
    async fn window_sub_totals(&self, user_id: Option<&str>, now: DateTime<Utc>) -> DbResult<Vec<Money>> {
        let since = now - Duration::days(AGGREGATE_WINDOW_DAYS);

        let raw: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT sub_total
            FROM sales_history
            WHERE (?1 IS NULL OR user_id = ?1) AND created_at > ?2 AND created_at <= ?3
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        raw.iter()
            .map(|value| parse_money("sales_history.sub_total", value))
            .collect()
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Converts a priced cart into a sales history record.
    ///
    /// Decrements stock, writes the history record and deletes the cart in
    /// a single transaction. Nothing is written if any line is short.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - a line references a product no longer in the catalog
    /// * `Err(DbError::InsufficientStock)` - a line wants more units than are in stock
    pub async fn checkout(&self, cart: &ShoppingCart) -> DbResult<SalesHistory> {
        let history = SalesHistory::from_cart(cart);

        info!(
            cart_id = %cart.id(),
            user_id = %cart.user_id(),
            sub_total = %history.sub_total,
            "Checking out basket"
        );

        let mut tx = self.pool.begin().await?;

        for item in cart.items() {
            let stock: Option<i64> =
                sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                    .bind(&item.product_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            let Some(stock) = stock else {
                warn!(product_id = %item.product_id, "Checkout line references missing product");
                return Err(DbError::not_found("Product", item.product_id.clone()));
            };

            if stock < item.quantity {
                warn!(
                    product_id = %item.product_id,
                    available = stock,
                    requested = item.quantity,
                    "Checkout rejected: insufficient stock"
                );
                return Err(DbError::InsufficientStock {
                    product_id: item.product_id.clone(),
                    available: stock,
                    requested: item.quantity,
                });
            }

            sqlx::query(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity - ?1, updated_at = ?2
                WHERE id = ?3
                "#,
            )
            .bind(item.quantity)
            .bind(history.created_at)
            .bind(&item.product_id)
            .execute(&mut *tx)
            .await?;
        }

        Self::write_history(&mut tx, &history).await?;

        sqlx::query("DELETE FROM shopping_carts WHERE id = ?1")
            .bind(cart.id())
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(sales_id = %history.id, "Checkout committed");
        Ok(history)
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Inserts a history record as-is (keeps its `created_at`).
    pub async fn insert_history(&self, history: &SalesHistory) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::write_history(&mut tx, history).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    /// Lists the user's orders, newest first.
    pub async fn history_for_user(&self, user_id: &str) -> DbResult<Vec<SalesHistory>> {
        let rows: Vec<SalesHistoryRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, total_price, total_vat, total_discount, sub_total, created_at
            FROM sales_history
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut history = Vec::with_capacity(rows.len());
        for row in rows {
            let items: Vec<SalesHistoryItemRow> = sqlx::query_as(
                "SELECT product_id, quantity FROM sales_history_items WHERE sales_history_id = ?1 ORDER BY rowid",
            )
            .bind(&row.id)
            .fetch_all(&self.pool)
            .await?;

            let items = items
                .into_iter()
                .map(|item| SalesHistoryItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect();
            history.push(row.into_history(items)?);
        }

        Ok(history)
    }

    async fn write_history(tx: &mut Transaction<'_, Sqlite>, history: &SalesHistory) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sales_history (
                id, user_id, total_price, total_vat, total_discount, sub_total, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&history.id)
        .bind(&history.user_id)
        .bind(history.total_price.amount().to_string())
        .bind(history.total_vat.amount().to_string())
        .bind(history.total_discount.amount().to_string())
        .bind(history.sub_total.amount().to_string())
        .bind(history.created_at)
        .execute(&mut **tx)
        .await?;

        for item in &history.items {
            sqlx::query(
                r#"
                INSERT INTO sales_history_items (id, sales_history_id, product_id, quantity)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&history.id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}
