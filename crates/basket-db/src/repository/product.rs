//! # Product Repository
//!
//! Catalog reads and writes.
//!
//! The basket only ever reads the catalog (price, VAT band, stock). Stock is
//! decremented inside the checkout transaction in
//! [`SalesRepository::checkout`](crate::repository::sales::SalesRepository::checkout),
//! not here.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{parse_money, parse_vat_rate};
use basket_core::validation::{
    validate_product_name, validate_stock_quantity, validate_unit_price, validate_vat_percent,
};
use basket_core::Product;

/// Raw `products` row.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    unit_price: String,
    vat_rate: i64,
    stock_quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> DbResult<Product> {
        Ok(Product {
            unit_price: parse_money("products.unit_price", &self.unit_price)?,
            vat_rate: parse_vat_rate("products.vat_rate", self.vat_rate)?,
            id: self.id,
            name: self.name,
            stock_quantity: self.stock_quantity,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_PRODUCT: &str = r#"
    SELECT id, name, unit_price, vat_rate, stock_quantity, created_at, updated_at
    FROM products
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let all = repo.list().await?;
/// let tea = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists the whole catalog ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!("{SELECT_PRODUCT} ORDER BY name, id"))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Listed products");
        rows.into_iter().map(ProductRow::into_product).collect()
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ProductRow::into_product).transpose()
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::Invalid)` - empty name, price out of range, VAT above 100% or negative stock
    /// * `Err(DbError::UniqueViolation)` - id already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_product_name(&product.name)?;
        validate_unit_price(product.unit_price)?;
        validate_vat_percent(product.vat_rate.percent())?;
        validate_stock_quantity(product.stock_quantity)?;

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, unit_price, vat_rate, stock_quantity, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.unit_price.amount().to_string())
        .bind(i64::from(product.vat_rate.percent()))
        .bind(product.stock_quantity)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Counts catalog products (for diagnostics and the seed tool).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
