//! # Store Error Types
//!
//! Error types for storage and order-path operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← adds context and the order taxonomy        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  API layer (excluded) ← maps to protocol status codes                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every coordinator operation fails fast and atomically: errors are
//! returned as typed results, never logged-and-swallowed here.

use thiserror::Error;

use shoplite_core::{CoreError, OrderStatus};

/// Storage and order-path errors.
///
/// Covers both the order-placement taxonomy (insufficient stock, invalid
/// transitions, ...) and wrapped sqlx failures with added context.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The ordering user does not exist.
    #[error("Unknown user: {0}")]
    InvalidUser(String),

    /// An order must contain at least one line.
    #[error("Order has no line items")]
    EmptyOrder,

    /// A line item's quantity must be a positive integer.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidLineItem { product_id: String, quantity: i64 },

    /// Not enough stock to reserve the requested quantity.
    ///
    /// Caller-retriable as a business decision: availability may or may
    /// not improve, so the core never retries internally.
    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// The order status state machine rejected the requested change.
    #[error("Order {order_id} is {from}, cannot transition to {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Transactional contention (e.g. SQLite reported the database as
    /// locked). Caller-retriable.
    #[error("Transaction conflict, try again")]
    Conflict,

    /// The transaction exceeded its time budget and was rolled back.
    /// No partial effects persist. Caller-retriable.
    #[error("Transaction timed out")]
    Timeout,

    /// Field-level input validation failure (bad name, email, price, ...).
    #[error("Validation error: {0}")]
    Validation(#[from] shoplite_core::ValidationError),

    /// Unique constraint violation (e.g. duplicate email).
    #[error("Duplicate {field}: already exists")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Underlying store failure with opaque cause. Fatal to the current
    /// operation only.
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether the caller may reasonably retry the failed operation.
    ///
    /// ## Classification
    /// - `InsufficientStock`, `Conflict`, `Timeout`: retriable (a business
    ///   decision; availability or contention may change)
    /// - `NotFound`, `InvalidUser`, `EmptyOrder`, `InvalidLineItem`,
    ///   `InvalidTransition`: non-retriable input errors
    /// - everything else: infrastructure failure, fatal to the current
    ///   operation only
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            StoreError::InsufficientStock { .. } | StoreError::Conflict | StoreError::Timeout
        )
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound     → StoreError::NotFound
/// sqlx::Error::Database        → analyze message for constraint type
///   "database is locked"       → StoreError::Conflict
///   UNIQUE constraint          → StoreError::UniqueViolation
///   FOREIGN KEY constraint     → StoreError::ForeignKeyViolation
/// sqlx::Error::PoolTimedOut    → StoreError::Timeout
/// Other                        → StoreError::Storage
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                // Contention: "database is locked" / "database table is locked"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    StoreError::UniqueViolation { field }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    StoreError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    StoreError::Conflict
                } else {
                    StoreError::Storage(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => StoreError::Timeout,

            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("Pool is closed".to_string()),

            _ => StoreError::Storage(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

/// Pure-core violations surface through the store with the same meaning.
impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyOrder => StoreError::EmptyOrder,
            CoreError::InvalidLineItem {
                product_id,
                quantity,
            } => StoreError::InvalidLineItem {
                product_id,
                quantity,
            },
            CoreError::Validation(v) => StoreError::Validation(v),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(StoreError::InsufficientStock {
            product_id: "p1".to_string(),
            available: 3,
            requested: 5,
        }
        .is_retriable());
        assert!(StoreError::Conflict.is_retriable());
        assert!(StoreError::Timeout.is_retriable());

        assert!(!StoreError::not_found("Product", "p1").is_retriable());
        assert!(!StoreError::InvalidUser("u1".to_string()).is_retriable());
        assert!(!StoreError::EmptyOrder.is_retriable());
        assert!(!StoreError::InvalidLineItem {
            product_id: "p1".to_string(),
            quantity: 0,
        }
        .is_retriable());
        assert!(!StoreError::InvalidTransition {
            order_id: "o1".to_string(),
            from: OrderStatus::Cancelled,
            to: OrderStatus::Cancelled,
        }
        .is_retriable());
    }

    #[test]
    fn test_core_error_conversion() {
        let err: StoreError = CoreError::EmptyOrder.into();
        assert!(matches!(err, StoreError::EmptyOrder));

        let err: StoreError = CoreError::InvalidLineItem {
            product_id: "p1".to_string(),
            quantity: -2,
        }
        .into();
        assert!(matches!(
            err,
            StoreError::InvalidLineItem { quantity: -2, .. }
        ));
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = StoreError::InvalidTransition {
            order_id: "o1".to_string(),
            from: OrderStatus::Cancelled,
            to: OrderStatus::Fulfilled,
        };
        assert_eq!(
            err.to_string(),
            "Order o1 is cancelled, cannot transition to fulfilled"
        );
    }
}
