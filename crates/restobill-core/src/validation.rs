//! # Validation Module
//!
//! Input validation for orders and bills.
//!
//! ## Two Kinds of Checks
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Styles                                  │
//! │                                                                         │
//! │  Gatekeeping (Result<(), ValidationError>)                             │
//! │  ├── validate_item_name / validate_price / validate_quantity           │
//! │  └── Used by Order::add_item; the operation is refused                 │
//! │                                                                         │
//! │  Advisory (Vec<ValidationError>)                                       │
//! │  ├── check_tax_rate / check_discount / check_payments                  │
//! │  └── Used on the billing screen; ALL issues are returned together,     │
//! │      the caller decides whether to block the charge or just warn      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use restobill_core::money::Money;
//! use restobill_core::types::Discount;
//! use restobill_core::validation::{check_discount, check_tax_rate};
//!
//! let subtotal = Money::from_paise(10000);
//! let mut issues = check_tax_rate(5.0);
//! issues.extend(check_discount(subtotal, &Discount::amount(500.0)));
//! assert_eq!(issues.len(), 1); // ₹500 off a ₹100 bill
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Discount, DiscountKind, PaymentSplit};
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a menu item name.
const MAX_ITEM_NAME_LEN: usize = 120;

// =============================================================================
// Gatekeeping Validators
// =============================================================================

/// Validates a menu item name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 120 characters
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "item name".to_string(),
        });
    }

    if name.chars().count() > MAX_ITEM_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "item name".to_string(),
            max: MAX_ITEM_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (complimentary items).
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a customer phone number (digits, optional leading '+', 10-15 digits).
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    let digits = phone.strip_prefix('+').unwrap_or(phone);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "customer phone".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    if !(10..=15).contains(&digits.len()) {
        return Err(ValidationError::OutOfRange {
            field: "customer phone digits".to_string(),
            min: 10,
            max: 15,
        });
    }

    Ok(())
}

// =============================================================================
// Advisory Checks
// =============================================================================

/// Flags a tax rate outside [0, 100] percent.
pub fn check_tax_rate(tax_rate_percent: f64) -> Vec<ValidationError> {
    if !tax_rate_percent.is_finite() {
        return vec![ValidationError::InvalidFormat {
            field: "tax rate".to_string(),
            reason: "must be a number".to_string(),
        }];
    }

    if !(0.0..=100.0).contains(&tax_rate_percent) {
        return vec![ValidationError::OutOfRange {
            field: "tax rate".to_string(),
            min: 0,
            max: 100,
        }];
    }

    Vec::new()
}

/// Flags a discount that the calculator will have to clamp.
///
/// ## Rules
/// - Non-numeric value → invalid format
/// - Percent outside [0, 100] → out of range
/// - Amount outside [0, subtotal] → out of range
pub fn check_discount(subtotal: Money, discount: &Discount) -> Vec<ValidationError> {
    if !discount.value.is_finite() {
        return vec![ValidationError::InvalidFormat {
            field: "discount".to_string(),
            reason: "must be a number".to_string(),
        }];
    }

    match discount.kind {
        DiscountKind::Percent => {
            if !(0.0..=100.0).contains(&discount.value) {
                return vec![ValidationError::OutOfRange {
                    field: "discount percent".to_string(),
                    min: 0,
                    max: 100,
                }];
            }
        }
        DiscountKind::Amount => {
            let amount = Money::from_major_f64(discount.value);
            if amount.is_negative() || amount > subtotal {
                return vec![ValidationError::AmountOutOfRange {
                    field: "discount".to_string(),
                    min: Money::zero(),
                    max: subtotal.non_negative(),
                }];
            }
        }
    }

    Vec::new()
}

/// Flags negative tenders in a split payment.
pub fn check_payments(splits: &[PaymentSplit]) -> Vec<ValidationError> {
    splits
        .iter()
        .filter(|s| s.amount.is_negative())
        .map(|s| ValidationError::MustBePositive {
            field: format!("{} payment", s.method),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
