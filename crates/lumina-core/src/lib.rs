//! # lumina-core: Stock Reservation Rules for Lumina Ops
//!
//! Pure business logic for the workshop point of sale: money and material
//! arithmetic, the availability checker, and the cart. Nothing in here
//! touches a database, a socket or a file.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lumina Ops Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                lumina-terminal (host app)                       │    │
//! │  │   command loop ──► CartState ──► CheckoutFinalizer              │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │               ★ lumina-core (THIS CRATE) ★                      │    │
//! │  │                                                                 │    │
//! │  │   ┌──────────┐  ┌──────────────┐  ┌──────────┐  ┌──────────┐    │    │
//! │  │   │  types   │  │ availability │  │   cart   │  │  ledger  │    │    │
//! │  │   │ Product  │  │  check_*     │  │  Cart    │  │  levels  │    │    │
//! │  │   └──────────┘  └──────────────┘  └──────────┘  └──────────┘    │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                lumina-db (SQLite, repositories)                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, RawMaterial, CheckoutPhase, checkout records
//! - [`money`] - Integer-cent money and basis-point tax
//! - [`quantity`] - Fixed-point material quantities
//! - [`ledger`] - Read view of raw material levels
//! - [`availability`] - The sellability predicate
//! - [`cart`] - The ticket being built
//! - [`error`] - Denials and domain errors
//! - [`validation`] - Input and seed validation
//!
//! ## Example Usage
//!
//! ```rust
//! use lumina_core::money::{Money, TaxRate};
//!
//! let subtotal = Money::from_major_minor(2950, 0);
//! let tax = subtotal.calculate_tax(TaxRate::from_bps(lumina_core::DEFAULT_TAX_RATE_BPS));
//! assert_eq!(tax.cents(), 47_200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod cart;
pub mod error;
pub mod ledger;
pub mod money;
pub mod quantity;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use availability::{check_availability, check_cart, Consumption};
pub use cart::{Cart, CartLine, CartSnapshot, CartTotals};
pub use error::{CoreError, CoreResult, DenialReason, Denied, ValidationError};
pub use ledger::{MaterialLedger, MaterialLevels};
pub use money::{Money, TaxRate};
pub use quantity::Quantity;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// IVA, 16%.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1600;

/// Maximum distinct products on one ticket.
pub const MAX_CART_LINES: usize = 100;

/// Maximum units of one product on one ticket.
///
/// Catches a stuck key long before the stock check would.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest catalog unit price, in cents: a full ticket of
/// [`MAX_CART_LINES`] lines at [`MAX_ITEM_QUANTITY`] units still fits in i64.
pub const MAX_UNIT_PRICE_CENTS: i64 = i64::MAX / (MAX_ITEM_QUANTITY * MAX_CART_LINES as i64);

/// Largest per-unit material requirement, in thousandths, under the same
/// full-ticket bound as [`MAX_UNIT_PRICE_CENTS`].
pub const MAX_REQUIREMENT_MILLI: i64 = i64::MAX / (MAX_ITEM_QUANTITY * MAX_CART_LINES as i64);

/// Maximum search text length, in characters.
pub const MAX_SEARCH_LENGTH: usize = 100;
