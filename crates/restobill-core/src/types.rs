//! # Domain Types
//!
//! Billing value types shared by the calculator and the frontend.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Billing Types                                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Discount     │   │  PaymentSplit   │   │  PaymentState   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  value (f64)    │   │  method         │   │  total          │       │
//! │  │  type           │   │  amount         │   │  received       │       │
//! │  │  percent|amount │   │                 │   │  balance        │       │
//! │  └─────────────────┘   └─────────────────┘   │  is_credit      │       │
//! │                                              └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │  BillBreakdown  │   │    Invoice      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  subtotal       │   │  order snapshot │       │
//! │  │  500 = 5%       │   │  discount/tax   │   │  breakdown      │       │
//! │  └─────────────────┘   │  total          │   │  payment state  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::order::Order;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 500 bps = 5% (restaurant GST).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage entered in settings.
    ///
    /// Negative and NaN inputs become 0%; the advisory validator is what
    /// tells the operator about them.
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Discount
// =============================================================================

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is a percentage of the subtotal.
    #[default]
    Percent,
    /// `value` is a fixed rupee amount.
    Amount,
}

/// A discount as entered on the billing screen.
///
/// `value` stays a float because that is what the operator types; it is
/// clamped and converted to paise by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Discount {
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: DiscountKind,
}

impl Discount {
    /// No discount.
    pub const fn none() -> Self {
        Discount {
            value: 0.0,
            kind: DiscountKind::Percent,
        }
    }

    /// Percentage discount (10.0 = 10%).
    pub const fn percent(value: f64) -> Self {
        Discount {
            value,
            kind: DiscountKind::Percent,
        }
    }

    /// Fixed discount in rupees.
    pub const fn amount(value: f64) -> Self {
        Discount {
            value,
            kind: DiscountKind::Amount,
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// Tender types accepted at the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    /// Amount recorded against the customer's credit account.
    Credit,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Upi => write!(f, "upi"),
            PaymentMethod::Credit => write!(f, "credit"),
        }
    }
}

/// One tender in a (possibly split) payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentSplit {
    pub method: PaymentMethod,
    pub amount: Money,
}

impl PaymentSplit {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        PaymentSplit { method, amount }
    }
}

// =============================================================================
// Payment State
// =============================================================================

/// Outcome of reconciling what was received against the bill total.
///
/// ## Invariant
/// `balance_amount = max(0, total - payment_received)` and
/// `is_credit = balance_amount > 0`. Build it with
/// [`crate::billing::payment_state`] rather than by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentState {
    pub total: Money,
    pub payment_received: Money,
    pub balance_amount: Money,
    pub is_credit: bool,
}

// =============================================================================
// Billing Settings
// =============================================================================

/// Business settings that feed the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct BillingSettings {
    /// Tax rate as a percentage (5.0 = 5% GST).
    pub tax_rate_percent: f64,

    /// Symbol printed before amounts on the bill.
    pub currency_symbol: String,
}

impl Default for BillingSettings {
    fn default() -> Self {
        BillingSettings {
            tax_rate_percent: 5.0,
            currency_symbol: "₹".to_string(),
        }
    }
}

impl BillingSettings {
    /// Settings with the given tax rate and the default currency symbol.
    pub fn with_tax_rate(tax_rate_percent: f64) -> Self {
        BillingSettings {
            tax_rate_percent,
            ..Default::default()
        }
    }

    /// Returns the configured rate in basis points.
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_percentage(self.tax_rate_percent)
    }

    /// Formats an amount with the configured symbol ("Rs 94.50").
    pub fn format_amount(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        format!(
            "{}{}{}.{:02}",
            sign,
            self.currency_symbol,
            amount.rupees().abs(),
            amount.paise_part()
        )
    }
}

// =============================================================================
// Bill Breakdown
// =============================================================================

/// Every figure printed in the totals block of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillBreakdown {
    pub subtotal: Money,
    pub discount: Money,
    /// `subtotal - discount`, never negative.
    pub taxable: Money,
    pub tax_rate: TaxRate,
    pub tax: Money,
    pub total: Money,
}

// =============================================================================
// Invoice
// =============================================================================

/// A finalized bill. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// Frozen copy of the order at billing time.
    pub order: Order,
    pub discount: Discount,
    pub breakdown: BillBreakdown,
    pub payments: Vec<PaymentSplit>,
    pub payment: PaymentState,
    /// Cash to hand back when more than the total was tendered.
    pub change_due: Money,
    /// Advisory validation messages present at finalization.
    pub issues: Vec<String>,
    #[ts(as = "String")]
    pub finalized_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(5.0).bps(), 500);
        assert_eq!(TaxRate::from_percentage(18.0).bps(), 1800);
        assert_eq!(TaxRate::from_percentage(2.5).bps(), 250);
        assert!((TaxRate::from_bps(825).percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_bad_percentage_is_zero() {
        assert!(TaxRate::from_percentage(-3.0).is_zero());
        assert!(TaxRate::from_percentage(f64::NAN).is_zero());
    }

    #[test]
    fn test_discount_wire_format() {
        let discount: Discount =
            serde_json::from_str(r#"{"value": 10, "type": "percent"}"#).unwrap();
        assert_eq!(discount, Discount::percent(10.0));

        let json = serde_json::to_value(Discount::amount(50.0)).unwrap();
        assert_eq!(json["type"], "amount");
    }

    #[test]
    fn test_settings_format_amount() {
        let settings = BillingSettings {
            currency_symbol: "Rs ".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.format_amount(Money::from_paise(9450)), "Rs 94.50");
        assert_eq!(settings.format_amount(Money::from_paise(-550)), "-Rs 5.50");
        assert_eq!(settings.tax_rate().bps(), 500);
    }

    #[test]
    fn test_settings_missing_fields_use_defaults() {
        let settings: BillingSettings =
            serde_json::from_str(r#"{"tax_rate_percent": 18}"#).unwrap();
        assert_eq!(settings.tax_rate().bps(), 1800);
        assert_eq!(settings.currency_symbol, "₹");
    }

    #[test]
    fn test_payment_method_serde() {
        let method: PaymentMethod = serde_json::from_str(r#""upi""#).unwrap();
        assert_eq!(method, PaymentMethod::Upi);
        assert_eq!(PaymentMethod::Credit.to_string(), "credit");
    }
}
