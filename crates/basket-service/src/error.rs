//! # Service Error Type
//!
//! Unified error type returned by every [`BasketService`](crate::BasketService)
//! operation.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Basket Engine                      │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                     │
//! │                                  ├──► ServiceError { code, message }   │
//! │  sqlx::Error ──────► DbError ────┘                                     │
//! │                                                                         │
//! │  Callers branch on `code`; `message` is for humans.                    │
//! │  Nothing here is retried.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! ```json
//! {
//!   "code": "DUPLICATE_ITEM",
//!   "message": "Product already in basket: 7f0c..."
//! }
//! ```

use basket_core::CoreError;
use basket_db::DbError;
use serde::Serialize;

/// Error returned from basket operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for basket operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product is not in the basket
    ItemNotFound,

    /// Product is not in the catalog
    ProductNotFound,

    /// Product is already in the basket
    DuplicateItem,

    /// Requested quantity exceeds stock
    InsufficientStock,

    /// Quantity below 1
    InvalidQuantity,

    /// Negative discount
    InvalidDiscount,

    /// Checkout of an empty basket
    EmptyCart,

    /// Historical aggregate unavailable (fail-fast policy)
    AggregateLookupFailed,

    /// Any other missing record
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ServiceError {
    /// Creates a new service error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError {
            code,
            message: message.into(),
        }
    }

    /// Creates an item-not-in-basket error.
    pub fn item_not_found(product_id: &str) -> Self {
        CoreError::ItemNotFound(product_id.to_string()).into()
    }

    /// Creates a product-not-in-catalog error.
    pub fn product_not_found(product_id: &str) -> Self {
        CoreError::ProductNotFound(product_id.to_string()).into()
    }

    /// Creates an aggregate lookup error.
    pub fn aggregate_lookup(aggregate: &str, reason: impl ToString) -> Self {
        CoreError::AggregateLookupFailed {
            aggregate: aggregate.to_string(),
            reason: reason.to_string(),
        }
        .into()
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::Internal, message)
    }
}

/// Converts core errors to service errors.
impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ItemNotFound(_) => ErrorCode::ItemNotFound,
            CoreError::ProductNotFound(_) => ErrorCode::ProductNotFound,
            CoreError::DuplicateItem(_) => ErrorCode::DuplicateItem,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InvalidQuantity(_) => ErrorCode::InvalidQuantity,
            CoreError::InvalidDiscount(_) => ErrorCode::InvalidDiscount,
            CoreError::EmptyCart => ErrorCode::EmptyCart,
            CoreError::AggregateLookupFailed { .. } => ErrorCode::AggregateLookupFailed,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ServiceError::new(code, err.to_string())
    }
}

/// Converts database errors to service errors.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } if entity == "Product" => {
                ServiceError::product_not_found(&id)
            }
            DbError::NotFound { entity, id } => {
                ServiceError::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
            }
            DbError::InsufficientStock {
                product_id,
                available,
                requested,
            } => CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            }
            .into(),
            DbError::Invalid(e) => CoreError::Validation(e).into(),
            DbError::UniqueViolation { field, value } => ServiceError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ServiceError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::Decode { column, reason } => {
                tracing::error!(column = %column, "Stored value failed to decode: {}", reason);
                ServiceError::new(ErrorCode::DatabaseError, "Stored data is corrupt")
            }
            DbError::ConnectionFailed(_) => {
                ServiceError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ServiceError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                ServiceError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ServiceError {}

/// Convenience type alias for Results with ServiceError.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use basket_core::ValidationError;

    #[test]
    fn test_core_error_codes() {
        let err: ServiceError = CoreError::DuplicateItem("p-1".to_string()).into();
        assert_eq!(err.code, ErrorCode::DuplicateItem);
        assert!(err.message.contains("p-1"));

        let err: ServiceError = CoreError::InvalidQuantity(0).into();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);

        let err: ServiceError = CoreError::Validation(ValidationError::Required {
            field: "user_id".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_db_error_codes() {
        let err: ServiceError = DbError::not_found("Product", "p-9").into();
        assert_eq!(err.code, ErrorCode::ProductNotFound);

        let err: ServiceError = DbError::not_found("ShoppingCart", "c-1").into();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err: ServiceError = DbError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let err: ServiceError = DbError::Invalid(ValidationError::Negative {
            field: "stock_quantity".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err: ServiceError = DbError::QueryFailed("syntax error".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("syntax"));
    }

    #[test]
    fn test_serializes_code_and_message() {
        let err = ServiceError::item_not_found("p-1");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "ITEM_NOT_FOUND");
        assert_eq!(json["message"], "Item not in basket: p-1");
        assert_eq!(err.to_string(), "[ItemNotFound] Item not in basket: p-1");
    }
}
