//! # Repository Module
//!
//! Database repository implementations for the basket engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  BasketService                                                         │
//! │       │                                                                 │
//! │       │  db.baskets().get_or_create("user-1")                          │
//! │       ▼                                                                 │
//! │  ProductRepository   get_by_id, list, insert, count                    │
//! │  BasketRepository    get_or_create, find_by_user, save, delete         │
//! │  SalesRepository     customer_monthly_spend, last_fourth_order_amount, │
//! │                      checkout, history_for_user                        │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money columns are TEXT. [`parse_money`] turns them back into
//! [`Money`] and reports the column on failure.

pub mod basket;
pub mod product;
pub mod sales;

use basket_core::{Money, VatRate};

use crate::error::{DbError, DbResult};

/// Parses a TEXT money column.
pub(crate) fn parse_money(column: &str, raw: &str) -> DbResult<Money> {
    raw.parse::<Money>()
        .map_err(|e| DbError::decode(column, e))
}

/// Converts an INTEGER VAT column.
pub(crate) fn parse_vat_rate(column: &str, raw: i64) -> DbResult<VatRate> {
    u32::try_from(raw)
        .map(VatRate::from_percent)
        .map_err(|e| DbError::decode(column, e))
}
