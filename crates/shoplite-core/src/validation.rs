//! # Validation Module
//!
//! Input validation and line-request normalization for Shoplite.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: API layer (excluded)                                         │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                       │
//! │  ├── Field checks (names, email, price, stock)                         │
//! │  └── Line merging (EmptyOrder, InvalidLineItem, duplicates)            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, ValidationError};
use crate::money::Money;
use crate::types::LineRequest;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Line Request Merging
// =============================================================================

/// Validates a caller's requested lines and normalizes them for placement.
///
/// ## What This Does
/// 1. Rejects an empty request (`EmptyOrder`)
/// 2. Rejects any non-positive quantity (`InvalidLineItem`)
/// 3. Merges duplicate product ids by summing quantities, so an order
///    never carries two lines for the same product
/// 4. Sorts the result by ascending product id
///
/// ## Why Sorted?
/// Every concurrent placement reserves stock in the same product order,
/// which rules out circular waits between two orders that touch
/// overlapping product sets.
///
/// ## Example
/// ```rust
/// use shoplite_core::types::LineRequest;
/// use shoplite_core::validation::merge_line_requests;
///
/// let merged = merge_line_requests(&[
///     LineRequest::new("p1", 3),
///     LineRequest::new("p1", 2),
/// ])
/// .unwrap();
///
/// assert_eq!(merged.len(), 1);
/// assert_eq!(merged[0].quantity, 5);
/// ```
pub fn merge_line_requests(requested: &[LineRequest]) -> Result<Vec<LineRequest>, CoreError> {
    if requested.is_empty() {
        return Err(CoreError::EmptyOrder);
    }

    let mut merged: Vec<LineRequest> = Vec::with_capacity(requested.len());

    for line in requested {
        if line.quantity <= 0 {
            return Err(CoreError::InvalidLineItem {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            });
        }

        match merged
            .iter_mut()
            .find(|existing| existing.product_id == line.product_id)
        {
            Some(existing) => {
                // Merge, never duplicate. Overflow of the merged quantity
                // is treated as an invalid line, not a panic.
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or(
                    CoreError::InvalidLineItem {
                        product_id: line.product_id.clone(),
                        quantity: line.quantity,
                    },
                )?;
            }
            None => merged.push(line.clone()),
        }
    }

    // Deterministic reservation order across all concurrent callers
    merged.sort_by(|a, b| a.product_id.cmp(&b.product_id));

    Ok(merged)
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a product or user display name.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - Must be at most 200 characters
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a contact email.
///
/// ## Rules
/// - Must not be empty
/// - Must contain exactly one `@` with text on both sides
///
/// Deliberately loose: the authoritative check is the confirmation mail
/// sent by the host application.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected a single @ with text on both sides".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price. Prices may be zero (free items) but never
/// negative.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a stock level. Stock may be zero but never negative.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_empty_request() {
        assert_eq!(merge_line_requests(&[]), Err(CoreError::EmptyOrder));
    }

    #[test]
    fn test_merge_rejects_zero_quantity() {
        let result = merge_line_requests(&[LineRequest::new("p1", 0)]);
        assert_eq!(
            result,
            Err(CoreError::InvalidLineItem {
                product_id: "p1".to_string(),
                quantity: 0,
            })
        );
    }

    #[test]
    fn test_merge_rejects_negative_quantity() {
        let result = merge_line_requests(&[LineRequest::new("p1", 2), LineRequest::new("p2", -1)]);
        assert!(matches!(result, Err(CoreError::InvalidLineItem { .. })));
    }

    #[test]
    fn test_merge_sums_duplicates() {
        let merged = merge_line_requests(&[
            LineRequest::new("p1", 3),
            LineRequest::new("p2", 1),
            LineRequest::new("p1", 2),
        ])
        .unwrap();

        assert_eq!(
            merged,
            vec![LineRequest::new("p1", 5), LineRequest::new("p2", 1)]
        );
    }

    #[test]
    fn test_merge_sorts_by_product_id() {
        let merged = merge_line_requests(&[
            LineRequest::new("zz", 1),
            LineRequest::new("aa", 1),
            LineRequest::new("mm", 1),
        ])
        .unwrap();

        let ids: Vec<&str> = merged.iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(ids, vec!["aa", "mm", "zz"]);
    }

    #[test]
    fn test_merge_overflow_is_an_error() {
        let result =
            merge_line_requests(&[LineRequest::new("p1", i64::MAX), LineRequest::new("p1", 1)]);
        assert!(matches!(result, Err(CoreError::InvalidLineItem { .. })));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Laptop").is_ok());
        assert!(validate_name("  ").is_err());
        assert!(validate_name(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@").is_err());
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_cents(-1)).is_err());
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-5).is_err());
    }
}
