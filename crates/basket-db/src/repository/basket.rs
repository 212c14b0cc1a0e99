//! # Basket Repository
//!
//! Persistence for one-per-user shopping carts.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  shopping_carts                  shopping_cart_items                    │
//! │  ──────────────                  ───────────────────                    │
//! │  id ◄──────────────────────────  cart_id                                │
//! │  user_id (UNIQUE)                product_id   (UNIQUE per cart)         │
//! │  total_discount                  quantity, unit_price, vat_rate         │
//! │                                  position     (display order)           │
//! │                                                                         │
//! │  total_price / total_vat / sub_total are NOT stored. Loading a cart    │
//! │  goes through ShoppingCart::restore, which recomputes them.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{parse_money, parse_vat_rate};
use basket_core::{CartItem, ShoppingCart};

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: String,
    user_id: String,
    total_discount: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: String,
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price: String,
    vat_rate: i64,
    added_at: DateTime<Utc>,
}

impl CartItemRow {
    fn into_item(self) -> DbResult<CartItem> {
        Ok(CartItem {
            unit_price: parse_money("shopping_cart_items.unit_price", &self.unit_price)?,
            vat_rate: parse_vat_rate("shopping_cart_items.vat_rate", self.vat_rate)?,
            id: self.id,
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            added_at: self.added_at,
        })
    }
}

/// Repository for basket database operations.
#[derive(Debug, Clone)]
pub struct BasketRepository {
    pool: SqlitePool,
}

impl BasketRepository {
    /// Creates a new BasketRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BasketRepository { pool }
    }

    /// Loads the user's basket, creating an empty one on first access.
    ///
    /// ## Flow
    /// ```text
    /// find_by_user ──► Some(cart) ──► return
    ///      │
    ///      └── None ──► INSERT ... ON CONFLICT(user_id) DO NOTHING
    ///                        │
    ///                        ▼
    ///                  find_by_user again (wins or loses the race,
    ///                  either way exactly one row exists)
    /// ```
    pub async fn get_or_create(&self, user_id: &str) -> DbResult<ShoppingCart> {
        if let Some(cart) = self.find_by_user(user_id).await? {
            return Ok(cart);
        }

        let cart = ShoppingCart::new(user_id);
        debug!(user_id = %user_id, cart_id = %cart.id(), "Creating basket");

        sqlx::query(
            r#"
            INSERT INTO shopping_carts (id, user_id, total_discount, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(cart.id())
        .bind(cart.user_id())
        .bind(cart.total_discount().amount().to_string())
        .bind(cart.created_at())
        .bind(cart.updated_at())
        .execute(&self.pool)
        .await?;

        self.find_by_user(user_id)
            .await?
            .ok_or_else(|| DbError::not_found("ShoppingCart", user_id))
    }

    /// Loads the user's basket, if one exists.
    pub async fn find_by_user(&self, user_id: &str) -> DbResult<Option<ShoppingCart>> {
        let row: Option<CartRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, total_discount, created_at, updated_at
            FROM shopping_carts
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let item_rows: Vec<CartItemRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, product_name, quantity, unit_price, vat_rate, added_at
            FROM shopping_cart_items
            WHERE cart_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .into_iter()
            .map(CartItemRow::into_item)
            .collect::<DbResult<Vec<_>>>()?;

        Ok(Some(ShoppingCart::restore(
            row.id,
            row.user_id,
            items,
            parse_money("shopping_carts.total_discount", &row.total_discount)?,
            row.created_at,
            row.updated_at,
        )))
    }

    /// Persists the basket: header row plus a full replacement of its items.
    ///
    /// Runs in one transaction so a reader never sees half the lines.
    pub async fn save(&self, cart: &ShoppingCart) -> DbResult<()> {
        debug!(
            cart_id = %cart.id(),
            items = cart.item_count(),
            discount = %cart.total_discount(),
            "Saving basket"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO shopping_carts (id, user_id, total_discount, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                total_discount = excluded.total_discount,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(cart.id())
        .bind(cart.user_id())
        .bind(cart.total_discount().amount().to_string())
        .bind(cart.created_at())
        .bind(cart.updated_at())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM shopping_cart_items WHERE cart_id = ?1")
            .bind(cart.id())
            .execute(&mut *tx)
            .await?;

        for (position, item) in cart.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO shopping_cart_items (
                    id, cart_id, product_id, product_name, quantity,
                    unit_price, vat_rate, position, added_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(cart.id())
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price.amount().to_string())
            .bind(i64::from(item.vat_rate.percent()))
            .bind(position as i64)
            .bind(item.added_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Deletes a basket and its items.
    pub async fn delete(&self, cart_id: &str) -> DbResult<()> {
        debug!(cart_id = %cart_id, "Deleting basket");

        let result = sqlx::query("DELETE FROM shopping_carts WHERE id = ?1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ShoppingCart", cart_id));
        }

        Ok(())
    }
}
