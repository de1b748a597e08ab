//! # Billing Calculator
//!
//! Pure functions that turn an order, a discount and a tax rate into bill
//! totals, and reconcile what was paid against them.
//!
//! ## Calculation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Bill Calculation                                  │
//! │                                                                         │
//! │  items ──► subtotal = Σ unit_price × qty                                │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  discount ──► discount_amount  (clamped to [0, subtotal])              │
//! │                │                                                        │
//! │                ▼                                                        │
//! │            taxable = subtotal - discount                                │
//! │                │                                                        │
//! │  tax rate ──► tax = taxable × rate        ◄── ALWAYS post-discount     │
//! │                │                                                        │
//! │                ▼                                                        │
//! │            total = subtotal - discount + tax                            │
//! │                │                                                        │
//! │  splits ────► received = Σ split amounts                                │
//! │                │                                                        │
//! │                ▼                                                        │
//! │            balance = max(0, total - received)                          │
//! │            is_credit = balance > 0                                      │
//! │            change  = max(0, received - total)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use restobill_core::billing;
//! use restobill_core::money::Money;
//! use restobill_core::order::OrderItem;
//! use restobill_core::types::{Discount, TaxRate};
//!
//! let items = [OrderItem::new("Thali", Money::from_paise(10000), 1)];
//! let subtotal = billing::subtotal(&items);
//! let discount = billing::discount_amount(subtotal, &Discount::percent(10.0));
//! let tax = billing::tax(subtotal, discount, TaxRate::from_bps(500));
//!
//! assert_eq!(billing::total(subtotal, discount, tax).paise(), 9450); // ₹94.50
//! ```

use chrono::Utc;
use uuid::Uuid;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::order::{Order, OrderItem};
use crate::types::{
    BillBreakdown, BillingSettings, Discount, DiscountKind, Invoice, PaymentSplit, PaymentState,
    TaxRate,
};
use crate::validation::{check_discount, check_payments, check_tax_rate};

/// Largest balance still treated as fully paid.
///
/// Amounts are integer paise, so there is no rounding noise to absorb:
/// any shortfall of one paisa or more is a real credit.
pub const CREDIT_TOLERANCE: Money = Money::zero();

// =============================================================================
// Pure Functions
// =============================================================================

/// Sum of `unit_price × quantity` over all lines.
pub fn subtotal(items: &[OrderItem]) -> Money {
    items.iter().map(OrderItem::line_total).sum()
}

/// Discount in paise, always within `[0, subtotal]`.
///
/// Negative and non-numeric values mean "no discount". Percentages above
/// 100 are treated as 100; amounts above the subtotal as the subtotal.
pub fn discount_amount(subtotal: Money, discount: &Discount) -> Money {
    if !subtotal.is_positive() || !discount.value.is_finite() || discount.value <= 0.0 {
        return Money::zero();
    }

    let amount = match discount.kind {
        DiscountKind::Percent => {
            let bps = (discount.value.min(100.0) * 100.0).round() as u32;
            subtotal.percentage_bps(bps)
        }
        DiscountKind::Amount => Money::from_major_f64(discount.value),
    };

    amount.non_negative().min(subtotal)
}

/// Tax on the post-discount amount.
pub fn tax(subtotal: Money, discount_amount: Money, rate: TaxRate) -> Money {
    (subtotal - discount_amount).non_negative().calculate_tax(rate)
}

/// `subtotal - discount + tax`.
pub fn total(subtotal: Money, discount_amount: Money, tax: Money) -> Money {
    subtotal - discount_amount + tax
}

/// Reconciles a received amount against the bill total.
///
/// ```rust
/// use restobill_core::billing::payment_state;
/// use restobill_core::money::Money;
///
/// let state = payment_state(Money::from_paise(9450), Money::from_paise(5000));
/// assert_eq!(state.balance_amount.paise(), 4450);
/// assert!(state.is_credit);
/// ```
pub fn payment_state(total: Money, received: Money) -> PaymentState {
    let balance_amount = (total - received).non_negative();

    PaymentState {
        total,
        payment_received: received,
        balance_amount,
        is_credit: balance_amount > CREDIT_TOLERANCE,
    }
}

/// Cash to return when more than the total was tendered.
pub fn change_due(total: Money, received: Money) -> Money {
    (received - total).non_negative()
}

/// Total received across split tenders. Negative tenders count as zero.
pub fn received_from_splits(splits: &[PaymentSplit]) -> Money {
    splits.iter().map(|s| s.amount.non_negative()).sum()
}

/// Payment state for a split payment (cash + card + UPI + credit).
///
/// The formula is identical no matter how many methods contributed.
pub fn reconcile_splits(total: Money, splits: &[PaymentSplit]) -> PaymentState {
    payment_state(total, received_from_splits(splits))
}

// =============================================================================
// Billing Calculator
// =============================================================================

/// Applies the business settings to orders.
///
/// Holds no state besides the settings, so a single instance can be
/// shared across tables.
#[derive(Debug, Clone, Default)]
pub struct BillingCalculator {
    settings: BillingSettings,
}

impl BillingCalculator {
    pub fn new(settings: BillingSettings) -> Self {
        BillingCalculator { settings }
    }

    pub fn settings(&self) -> &BillingSettings {
        &self.settings
    }

    /// Computes every figure of the totals block.
    pub fn breakdown(&self, order: &Order, discount: &Discount) -> BillBreakdown {
        let subtotal = subtotal(&order.items);
        let discount = discount_amount(subtotal, discount);
        let tax_rate = self.settings.tax_rate();
        let tax = tax(subtotal, discount, tax_rate);

        BillBreakdown {
            subtotal,
            discount,
            taxable: (subtotal - discount).non_negative(),
            tax_rate,
            tax,
            total: total(subtotal, discount, tax),
        }
    }

    /// Collects every advisory issue for the billing screen.
    ///
    /// Never fails; an empty list means the bill is clean.
    pub fn check(
        &self,
        order: &Order,
        discount: &Discount,
        splits: &[PaymentSplit],
    ) -> Vec<ValidationError> {
        let mut issues = Vec::new();

        if order.is_empty() {
            issues.push(ValidationError::Required {
                field: "order items".to_string(),
            });
        }

        issues.extend(check_tax_rate(self.settings.tax_rate_percent));
        issues.extend(check_discount(subtotal(&order.items), discount));
        issues.extend(check_payments(splits));
        issues
    }

    /// Finalizes an order into an immutable invoice.
    ///
    /// ## Errors
    /// Malformed orders (empty, non-positive quantities, negative prices)
    /// are programming errors and are returned as `CoreError`. Advisory
    /// issues do NOT fail finalization; they are recorded on the invoice.
    pub fn finalize(
        &self,
        order: &Order,
        discount: &Discount,
        splits: &[PaymentSplit],
    ) -> CoreResult<Invoice> {
        order.ensure_well_formed()?;

        let breakdown = self.breakdown(order, discount);
        let payment = reconcile_splits(breakdown.total, splits);
        let issues = self
            .check(order, discount, splits)
            .iter()
            .map(ToString::to_string)
            .collect();

        Ok(Invoice {
            id: Uuid::new_v4().to_string(),
            order: order.clone(),
            discount: *discount,
            breakdown,
            payments: splits.to_vec(),
            payment,
            change_due: change_due(breakdown.total, payment.payment_received),
            issues,
            finalized_at: Utc::now(),
        })
    }
}

/// One-shot finalization for callers that do not keep a calculator around.
pub fn finalize_invoice(
    order: &Order,
    discount: &Discount,
    settings: &BillingSettings,
    splits: &[PaymentSplit],
) -> CoreResult<Invoice> {
    BillingCalculator::new(settings.clone()).finalize(order, discount, splits)
}

// =============================================================================
// Unit Tests
// =============================================================================
