//! # restobill-core: Pure Billing Logic for RestoBill
//!
//! Orders, money, discounts, tax and payment reconciliation as pure
//! functions. Nothing in this crate touches the disk, the network or a
//! printer.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      RestoBill Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (billing screens)                   │   │
//! │  │    Menu ──► Current Order ──► Bill ──► Payment ──► Print       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ restobill-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   order   │  │   money   │  │  billing  │  │ validation│  │   │
//! │  │   │   Order   │  │   Money   │  │ subtotal  │  │ advisory  │  │   │
//! │  │   │ OrderItem │  │  paise    │  │ tax/total │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌──────────────────┐  ┌───────▼──────────┐  ┌──────────────────┐      │
//! │  │ restobill-store  │  │ restobill-sync   │  │restobill-printer │      │
//! │  │  durable state   │  │  offline queue   │  │  BLE thermal     │      │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type in integer paise
//! - [`order`] - The open order at a table
//! - [`billing`] - Subtotal, discount, tax, total and payment state
//! - [`types`] - Discounts, payments, invoices
//! - [`validation`] - Gatekeeping and advisory checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use restobill_core::{BillingCalculator, Discount, Money, Order};
//!
//! let mut order = Order::new(3, "Ravi");
//! order.add_item("Veg Thali", Money::from_paise(10000), 1).unwrap();
//!
//! let calc = BillingCalculator::default(); // 5% GST
//! let bill = calc.breakdown(&order, &Discount::percent(10.0));
//!
//! assert_eq!(bill.tax.paise(), 450);
//! assert_eq!(bill.total.to_string(), "₹94.50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use billing::BillingCalculator;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order::{Order, OrderItem};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single order.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches fat-finger entries (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
