//! # Cart Aggregator
//!
//! The ticket being built at the counter: ordered lines, unique per product,
//! gated by the availability checker on every added unit.
//!
//! ## Cart Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator action        Cart method            Effect                   │
//! │  ───────────────        ───────────            ──────                   │
//! │  tap product card  ───► add_or_increment() ──► check(qty + 1), then     │
//! │                                                 append or increment     │
//! │  "−" on a line     ───► decrement()        ──► qty − 1, floor 1         │
//! │  trash icon        ───► remove()           ──► line gone (no-op if not) │
//! │  "reset ticket"    ───► clear()            ──► empty                    │
//! │  any render        ───► totals()           ──► recomputed every time    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by product id and keep insertion order
//! - Every line quantity is >= 1
//! - A denied add leaves the cart exactly as it was
//! - Totals are never stored, only derived

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::availability::{check_availability, Consumption};
use crate::error::{CoreError, CoreResult};
use crate::ledger::MaterialLevels;
use crate::money::{Money, TaxRate};
use crate::types::{Category, Product};
use crate::validation::validate_quantity;
use crate::MAX_CART_LINES;

// =============================================================================
// Cart Line
// =============================================================================

/// One product in the cart.
///
/// `product` is the catalog row as it was when the line was created; the
/// price shown on the ticket does not move if the catalog is edited later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    fn new(product: Product) -> Self {
        CartLine {
            product,
            quantity: 1,
            added_at: Utc::now(),
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product.id
    }

    /// unit price × quantity
    pub fn line_total(&self) -> Money {
        self.product.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// An in-progress ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    tax_rate: TaxRate,
    created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart taxed at `tax_rate`.
    pub fn new(tax_rate: TaxRate) -> Self {
        Cart {
            lines: Vec::new(),
            tax_rate,
            created_at: Utc::now(),
        }
    }

    /// Adds one unit of `product`.
    ///
    /// The target quantity (current + 1) is checked against `product` as
    /// given, so callers pass a fresh catalog read. On denial nothing
    /// changes and the error lists every blocking resource.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let snapshot = cart.add_or_increment(&product, &ledger)?;
    /// assert_eq!(snapshot.totals.total_quantity, 1);
    /// ```
    pub fn add_or_increment<L>(&mut self, product: &Product, ledger: &L) -> CoreResult<CartSnapshot>
    where
        L: MaterialLevels + ?Sized,
    {
        let position = self.position(&product.id);
        let current = position.map(|i| self.lines[i].quantity).unwrap_or(0);
        let target = current + 1;

        validate_quantity(target)?;

        if position.is_none() && self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        check_availability(product, target, ledger)?;

        match position {
            Some(i) => self.lines[i].quantity = target,
            None => self.lines.push(CartLine::new(product.clone())),
        }

        Ok(self.snapshot())
    }

    /// Removes one unit. At quantity 1, or for an unknown id, nothing happens.
    pub fn decrement(&mut self, product_id: &str) -> CartSnapshot {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product.id == product_id) {
            if line.quantity > 1 {
                line.quantity -= 1;
            }
        }
        self.snapshot()
    }

    /// Deletes the line for `product_id` if present.
    pub fn remove(&mut self, product_id: &str) -> CartSnapshot {
        self.lines.retain(|l| l.product.id != product_id);
        self.snapshot()
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.created_at = Utc::now();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product.id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Subtotal, tax and total as of right now.
    pub fn totals(&self) -> CartTotals {
        let subtotal: Money = self.lines.iter().map(CartLine::line_total).sum();
        let tax = subtotal.calculate_tax(self.tax_rate);

        CartTotals {
            line_count: self.lines.len(),
            total_quantity: self.lines.iter().map(|l| l.quantity).sum(),
            subtotal,
            tax_rate_bps: self.tax_rate.bps(),
            tax,
            total: subtotal + tax,
        }
    }

    /// Aggregate demand of every line, using the snapshotted bills of
    /// materials.
    pub fn consumption(&self) -> Consumption {
        Consumption::from_lines(self.lines.iter().map(|l| (&l.product, l.quantity)))
    }

    /// Read model for the host.
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            lines: self.lines.iter().map(CartLineView::from).collect(),
            totals: self.totals(),
        }
    }

    fn position(&self, product_id: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.product.id == product_id)
    }
}

// =============================================================================
// Read Models
// =============================================================================

/// Ticket totals. Tax applies to the subtotal, rounded half-up to the cent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub line_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub tax_rate_bps: u32,
    pub tax: Money,
    pub total: Money,
}

/// One rendered ticket line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLineView {
    pub product_id: String,
    pub name: String,
    pub category: Category,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        CartLineView {
            product_id: line.product.id.clone(),
            name: line.product.name.clone(),
            category: line.product.category,
            unit_price: line.product.unit_price,
            quantity: line.quantity,
            line_total: line.line_total(),
        }
    }
}

/// Lines plus totals, returned by every cart operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartSnapshot {
    pub lines: Vec<CartLineView>,
    pub totals: CartTotals,
}

// =============================================================================
// Unit Tests
// =============================================================================
