//! # Quantity Module
//!
//! Fixed-point quantities for raw materials.
//!
//! Materials are measured in their own units (meters of neon hose, acrylic
//! sheets, transformer units) and recipes use fractions of them: a small
//! "Open" sign takes half a sheet of acrylic. Floats would make
//! `0.5 * 3 <= 1.5` a coin toss, so a quantity is an integer count of
//! thousandths, exactly like [`Money`](crate::money::Money) is a count of cents.
//!
//! ```text
//! 5 m of hose    → Quantity(5000)
//! 0.5 sheet      → Quantity(500)
//! 45 m in stock  → Quantity(45000)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

/// Thousandths per whole unit.
pub const MILLI_PER_UNIT: i64 = 1000;

/// A material quantity with three fractional digits.
///
/// Serialized as the raw thousandths count (`{"available": 45000}`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Largest representable quantity. A demand that does not fit is pinned
    /// here and no ledger level ever covers it.
    pub const MAX: Quantity = Quantity(i64::MAX);

    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Whole units, e.g. `Quantity::from_units(45)` = 45 meters.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * MILLI_PER_UNIT)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn is_saturated(&self) -> bool {
        self.0 == i64::MAX
    }

    #[inline]
    pub const fn checked_times(&self, count: i64) -> Option<Self> {
        match self.0.checked_mul(count) {
            Some(milli) => Some(Quantity(milli)),
            None => None,
        }
    }

    /// Demand for `count` finished units at this per-unit requirement.
    /// Overflow saturates at [`Quantity::MAX`].
    ///
    /// ```rust
    /// use lumina_core::quantity::Quantity;
    ///
    /// let per_sign = Quantity::from_milli(500); // half a sheet
    /// assert_eq!(per_sign.times(3), Quantity::from_milli(1500));
    /// assert_eq!(Quantity::from_milli(i64::MAX / 2 + 1).times(2), Quantity::MAX);
    /// ```
    #[inline]
    pub const fn times(&self, count: i64) -> Self {
        match self.checked_times(count) {
            Some(q) => q,
            None => Quantity::MAX,
        }
    }

    /// Sum that pins at [`Quantity::MAX`] instead of wrapping.
    #[inline]
    pub const fn saturating_add(self, other: Self) -> Self {
        Quantity(self.0.saturating_add(other.0))
    }
}

/// Renders whole quantities without decimals and trims trailing zeros
/// otherwise: `45`, `0.5`, `1.25`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = (self.0 / MILLI_PER_UNIT).abs();
        let frac = (self.0 % MILLI_PER_UNIT).abs();

        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }

        let digits = format!("{:03}", frac);
        write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), Add::add)
    }
}
