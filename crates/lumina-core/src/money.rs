//! # Money Module
//!
//! Integer-cent money and basis-point tax rates.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Ticket: Neón Flex Pro 5m ×2 + Eliminador 12V ×1                        │
//! │                                                                         │
//! │    1250.00 × 2 + 450.00   = 2950.00   (295000 cents)                    │
//! │    IVA 16% (1600 bps)     =  472.00   ( 47200 cents)                    │
//! │    Total                  = 3422.00   (342200 cents)                    │
//! │                                                                         │
//! │  Every step is integer math, so the ticket shown at the counter and     │
//! │  the checkout record written to the database can never disagree.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use lumina_core::money::{Money, TaxRate};
//!
//! let price = Money::from_major_minor(1250, 0);
//! let subtotal = price.multiply_quantity(2) + Money::from_major_minor(450, 0);
//! let tax = subtotal.calculate_tax(TaxRate::from_bps(1600));
//! assert_eq!(tax, Money::from_major_minor(472, 0));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (centavos).
///
/// ## Design Decisions
/// - **i64 (signed)**: refunds and adjustments can be negative
/// - **Single field tuple struct**: zero-cost wrapper over i64
/// - **Serialized as the raw cent count**: `{"unit_price": 125000}`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole units and cents.
    ///
    /// ## Example
    /// ```rust
    /// use lumina_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(1250, 0).cents(), 125_000);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Line total for `qty` units at this unit price.
    ///
    /// Saturates instead of wrapping; catalog prices are capped at
    /// [`MAX_UNIT_PRICE_CENTS`](crate::MAX_UNIT_PRICE_CENTS) so a valid ticket
    /// never gets there.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        match self.0.checked_mul(qty) {
            Some(cents) => Money(cents),
            None if (self.0 < 0) == (qty < 0) => Money(i64::MAX),
            None => Money(i64::MIN),
        }
    }

    /// Calculates tax on this amount.
    ///
    /// Integer math: `(amount * bps + 5000) / 10000`, i.e. half-up rounding
    /// to the nearest cent. `i128` keeps large tickets from overflowing.
    ///
    /// ```rust
    /// use lumina_core::money::{Money, TaxRate};
    ///
    /// // 10.03 at 16% = 1.6048 → 1.60
    /// let tax = Money::from_cents(1003).calculate_tax(TaxRate::from_bps(1600));
    /// assert_eq!(tax.cents(), 160);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }
}

/// Debug-style rendering; the host formats with the configured currency.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1 bps = 0.01%).
///
/// Mexican IVA is 16% = 1600 bps, which is the terminal default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Percentage for display only (never used in calculations).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
