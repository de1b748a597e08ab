//! # Order
//!
//! The "current order" being built at a table before it is billed.
//!
//! ## Order Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Order Operations                                     │
//! │                                                                         │
//! │  Waiter Action            Operation                State Change         │
//! │  ─────────────            ─────────                ────────────         │
//! │                                                                         │
//! │  Tap menu item ─────────► add_item() ────────────► push or qty += n    │
//! │                                                                         │
//! │  Change quantity ───────► update_quantity() ─────► items[i].qty = n    │
//! │                                                                         │
//! │  Swipe to remove ───────► remove_item() ─────────► items.remove(i)     │
//! │                                                                         │
//! │  Cancel order ──────────► clear() ───────────────► items.clear()       │
//! │                                                                         │
//! │  Generate bill ─────────► BillingCalculator::finalize() → Invoice      │
//! │                           (the Invoice holds a frozen copy)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by (name, unit price); re-adding bumps the quantity
//! - Quantity is always 1..=MAX_ITEM_QUANTITY while in the order
//! - At most MAX_ORDER_ITEMS distinct lines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::{validate_item_name, validate_price, validate_quantity};
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS};

// =============================================================================
// Order Item
// =============================================================================

/// A line in the order.
///
/// The unit price is frozen when the item is added; later menu price
/// changes do not affect an open order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    /// Menu item name as printed on the KOT and bill.
    pub name: String,

    /// Unit price in paise.
    pub unit_price: Money,

    /// Quantity ordered.
    pub quantity: i64,
}

impl OrderItem {
    /// Creates a new order line.
    pub fn new(name: impl Into<String>, unit_price: Money, quantity: i64) -> Self {
        OrderItem {
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// Line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    fn same_line(&self, name: &str, unit_price: Money) -> bool {
        self.name == name && self.unit_price == unit_price
    }
}

// =============================================================================
// Order
// =============================================================================

/// An open order at a table.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Items in the order.
    pub items: Vec<OrderItem>,

    /// Table the order belongs to (0 for takeaway/counter).
    pub table_number: u32,

    /// Optional customer name (printed on the bill).
    pub customer_name: Option<String>,

    /// Optional customer phone (used for WhatsApp bills, credit tracking).
    pub customer_phone: Option<String>,

    /// Waiter who took the order.
    pub waiter_name: String,

    /// When the order was opened.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Opens a new empty order for a table.
    pub fn new(table_number: u32, waiter_name: impl Into<String>) -> Self {
        Order {
            id: Uuid::new_v4().to_string(),
            items: Vec::new(),
            table_number,
            customer_name: None,
            customer_phone: None,
            waiter_name: waiter_name.into(),
            created_at: Utc::now(),
        }
    }

    /// Attaches customer details.
    pub fn with_customer(mut self, name: Option<String>, phone: Option<String>) -> Self {
        self.customer_name = name;
        self.customer_phone = phone;
        self
    }

    /// Adds an item or increases its quantity if the same line exists.
    ///
    /// ## Errors
    /// - `Validation` for an empty name, negative price or bad quantity
    /// - `QuantityTooLarge` if the merged quantity would exceed the cap
    /// - `OrderTooLarge` if a new line would exceed the line cap
    pub fn add_item(&mut self, name: &str, unit_price: Money, quantity: i64) -> CoreResult<()> {
        validate_item_name(name)?;
        validate_price(unit_price)?;
        validate_quantity(quantity)?;

        let name = name.trim();

        if let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.same_line(name, unit_price))
        {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity = new_qty;
            return Ok(());
        }

        if self.items.len() >= MAX_ORDER_ITEMS {
            return Err(CoreError::OrderTooLarge {
                max: MAX_ORDER_ITEMS,
            });
        }

        self.items.push(OrderItem::new(name, unit_price, quantity));
        Ok(())
    }

    /// Sets the quantity of a line. A quantity of 0 removes the line.
    pub fn update_quantity(&mut self, name: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(name);
        }

        validate_quantity(quantity)?;

        match self.items.iter_mut().find(|i| i.name == name) {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(CoreError::ItemNotFound(name.to_string())),
        }
    }

    /// Removes every line with the given name.
    pub fn remove_item(&mut self, name: &str) -> CoreResult<()> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.name != name);

        if self.items.len() == initial_len {
            Err(CoreError::ItemNotFound(name.to_string()))
        } else {
            Ok(())
        }
    }

    /// Removes all items.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Checks if the order is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Checks structural invariants before billing.
    ///
    /// Orders built through `add_item` always pass; this guards orders
    /// deserialized from the frontend or from persisted state.
    pub fn ensure_well_formed(&self) -> CoreResult<()> {
        if self.items.is_empty() {
            return Err(CoreError::EmptyOrder);
        }

        for item in &self.items {
            if item.quantity <= 0 {
                return Err(CoreError::MalformedOrder {
                    reason: format!("'{}' has non-positive quantity {}", item.name, item.quantity),
                });
            }
            if item.unit_price.is_negative() {
                return Err(CoreError::MalformedOrder {
                    reason: format!("'{}' has negative unit price {}", item.name, item.unit_price),
                });
            }
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
