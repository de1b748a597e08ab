//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    94.5 - 94.49999999999999 = 0.000000000000014  → "credit" flag!       │
//! │                                                                         │
//! │  Epsilon checks (Math.abs(x) < 0.01) patch this, but inconsistently.   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    9450 paise - 9450 paise = 0 paise, exactly                          │
//! │    Floats are converted ONCE, at the UI boundary, by rounding          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use restobill_core::money::Money;
//!
//! // Create from paise (preferred)
//! let price = Money::from_paise(24950); // ₹249.50
//!
//! // Arithmetic operations
//! let doubled = price * 2;                    // ₹499.00
//! let total = price + Money::from_paise(500); // ₹254.50
//! assert_eq!(doubled.paise(), 49900);
//! assert_eq!(total.paise(), 25450);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (paise for INR).
///
/// ## Design Decisions
/// - **i64 (signed)**: Intermediate results (e.g. `total - received`) may go
///   negative before being clamped
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support; serializes as a bare integer
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  OrderItem.unit_price ──► line total ──► subtotal                       │
/// │                                            │                            │
/// │                               discount ◄───┤                            │
/// │                                            ▼                            │
/// │                               taxable ──► tax ──► total                 │
/// │                                                     │                   │
/// │  PaymentSplit.amount ──► received ─────────────────►│ balance / change  │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use restobill_core::money::Money;
    ///
    /// let price = Money::from_paise(1099); // ₹10.99
    /// assert_eq!(price.paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    /// `from_rupees_paise(-5, 50)` = -₹5.50, not -₹4.50
    ///
    /// ```rust
    /// use restobill_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees_paise(94, 50).paise(), 9450);
    /// assert_eq!(Money::from_rupees_paise(-5, 50).paise(), -550);
    /// ```
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Converts a floating-point rupee amount coming from the UI.
    ///
    /// This is the ONLY place floats enter the billing math. The value is
    /// rounded to the nearest paisa; NaN and infinities become zero.
    ///
    /// ```rust
    /// use restobill_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_f64(94.5).paise(), 9450);
    /// assert_eq!(Money::from_major_f64(0.1 + 0.2).paise(), 30);
    /// assert_eq!(Money::from_major_f64(f64::NAN).paise(), 0);
    /// ```
    pub fn from_major_f64(amount: f64) -> Self {
        if !amount.is_finite() {
            return Money::zero();
        }
        // `as` saturates on overflow, which is the behavior we want here
        Money((amount * 100.0).round() as i64)
    }

    /// Returns the value as floating-point rupees (display/interop only).
    #[inline]
    pub fn to_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the rupee portion.
    ///
    /// ```rust
    /// use restobill_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(1099).rupees(), 10);
    /// assert_eq!(Money::from_paise(-550).rupees(), -5);
    /// ```
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// ```rust
    /// use restobill_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(-10).non_negative(), Money::zero());
    /// assert_eq!(Money::from_paise(10).non_negative().paise(), 10);
    /// ```
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Calculates tax on this amount, rounding half away from zero.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use restobill_core::money::Money;
    /// use restobill_core::types::TaxRate;
    ///
    /// let taxable = Money::from_paise(9000); // ₹90.00
    /// let gst = TaxRate::from_bps(500);      // 5%
    /// assert_eq!(taxable.calculate_tax(gst).paise(), 450); // ₹4.50
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.percentage_bps(rate.bps())
    }

    /// Returns `bps` basis points of this amount (10000 bps = 100%).
    ///
    /// ```rust
    /// use restobill_core::money::Money;
    ///
    /// let subtotal = Money::from_paise(10000);
    /// assert_eq!(subtotal.percentage_bps(1000).paise(), 1000); // 10%
    /// ```
    pub fn percentage_bps(&self, bps: u32) -> Money {
        // i128 prevents overflow on large amounts
        let portion = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money::from_paise(portion as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as rupees for logs and debugging.
///
/// ## Note
/// The frontend formats currency for the operator; this is not localized.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.paise(), 1099);
        assert_eq!(money.rupees(), 10);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(9450).to_string(), "₹94.50");
        assert_eq!(Money::from_paise(500).to_string(), "₹5.00");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_from_major_f64_rounds_to_nearest_paisa() {
        assert_eq!(Money::from_major_f64(44.5).paise(), 4450);
        assert_eq!(Money::from_major_f64(12.999).paise(), 1300);
        assert_eq!(Money::from_major_f64(-2.25).paise(), -225);
        assert_eq!(Money::from_major_f64(f64::INFINITY).paise(), 0);
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((a * 3).paise(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.paise(), 2000);
    }

    #[test]
    fn test_tax_rounding() {
        // ₹10.00 at 8.25% = ₹0.825 → ₹0.83
        let amount = Money::from_paise(1000);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(825)).paise(), 83);

        // ₹90.00 at 5% = ₹4.50 exactly
        let taxable = Money::from_paise(9000);
        assert_eq!(taxable.calculate_tax(TaxRate::from_bps(500)).paise(), 450);
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(Money::from_paise(-1).non_negative(), Money::zero());
        assert_eq!(Money::from_paise(0).non_negative(), Money::zero());
        assert_eq!(Money::from_paise(7).non_negative().paise(), 7);
    }

    #[test]
    fn test_serializes_as_integer_paise() {
        let json = serde_json::to_string(&Money::from_paise(9450)).unwrap();
        assert_eq!(json, "9450");
    }
}
