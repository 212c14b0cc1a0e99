//! # Error Types
//!
//! Domain-specific error types for basket-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  basket-core errors (this file)                                        │
//! │  ├── CoreError        - Basket rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  basket-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  basket-service errors                                                 │
//! │  └── ServiceError     - code + message seen by callers                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                          DbError ───┴──► ServiceError → caller         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Basket business-rule errors.
///
/// Every variant is a distinct, non-retryable outcome.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The product is not in the basket.
    #[error("Item not in basket: {0}")]
    ItemNotFound(String),

    /// The product does not exist in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The product is already in the basket.
    ///
    /// ## User Workflow
    /// ```text
    /// Add Tea (qty 2) ──► basket has Tea ──► DuplicateItem("tea-id")
    ///                                              │
    ///                                              ▼
    ///                        caller should use update_item instead
    /// ```
    #[error("Product already in basket: {0}")]
    DuplicateItem(String),

    /// Insufficient stock to cover the requested quantity.
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Quantity below 1 or above the per-line cap.
    #[error("Invalid quantity: {0} (must be between 1 and {max})", max = crate::MAX_ITEM_QUANTITY)]
    InvalidQuantity(i64),

    /// Negative discount amount.
    #[error("Invalid discount amount: {0}")]
    InvalidDiscount(Money),

    /// Checkout of a basket with no items.
    #[error("Basket is empty")]
    EmptyCart,

    /// A historical aggregate could not be fetched and the service runs
    /// in fail-fast mode.
    #[error("Failed to look up {aggregate}: {reason}")]
    AggregateLookupFailed { aggregate: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
