//! # Error Types
//!
//! Domain-specific error types for restobill-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  restobill-core errors (this file)                                     │
//! │  ├── CoreError        - Programming errors (malformed order, bad ops)  │
//! │  └── ValidationError  - Advisory input issues (returned as a list)     │
//! │                                                                         │
//! │  Flow:                                                                  │
//! │    CoreError       → propagated with `?`, never masked                  │
//! │    ValidationError → collected into Vec, caller decides block or warn  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item name, amounts, etc.)
//! 3. Each variant maps to an operator-facing message

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent misuse of the order/billing API. Unlike validation
/// issues they are not collected; they abort the operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Item is not present in the order.
    #[error("Item not found in order: {0}")]
    ItemNotFound(String),

    /// Order has exceeded maximum allowed line items.
    #[error("Order cannot have more than {max} items")]
    OrderTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Order has no items and cannot be billed.
    #[error("Order has no items")]
    EmptyOrder,

    /// Order data violates a structural invariant.
    ///
    /// ## When This Occurs
    /// - A line with zero or negative quantity reaches finalization
    /// - A line with a negative unit price
    /// - Totals overflow
    #[error("Malformed order: {reason}")]
    MalformedOrder { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation issues.
///
/// Billing checks return these as a `Vec` so the UI can show every
/// problem at once. Single-field validators return them as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
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

    /// Monetary value is out of range.
    #[error("{field} must be between {min} and {max}")]
    AmountOutOfRange {
        field: String,
        min: Money,
        max: Money,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (not a number, invalid phone, ...).
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::QuantityTooLarge {
            requested: 1200,
            max: 999,
        };
        assert_eq!(err.to_string(), "Quantity 1200 exceeds maximum allowed (999)");
    }

    #[test]
    fn test_amount_range_message_uses_rupees() {
        let err = ValidationError::AmountOutOfRange {
            field: "discount".to_string(),
            min: Money::zero(),
            max: Money::from_paise(10000),
        };
        assert_eq!(err.to_string(), "discount must be between ₹0.00 and ₹100.00");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "item name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
