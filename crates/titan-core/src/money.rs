//! # Money Module
//!
//! Provides the `Money` type used for drawer cash, sales totals and variances.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE RE-AGGREGATION PROBLEM                                             │
//! │                                                                         │
//! │  A shift's expected cash is re-derived every time a count is taken     │
//! │  and every time validation re-runs. Summing floats again and again:    │
//! │    0.1 + 0.2 = 0.30000000000000004                                     │
//! │  makes "variance = 0.00" flicker between runs.                         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Callers send decimal amounts, we convert ONCE at the boundary       │
//! │    and every sum after that is exact.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use titan_core::money::Money;
//!
//! let starting = Money::from_cents(10_000);   // $100.00
//! let sales = Money::from_decimal(250.0);     // boundary conversion
//! let expected = starting + sales;
//! assert_eq!(expected.cents(), 35_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money Flows
/// ```text
/// SalesTransaction.cash_amount ──┐
///                                ├──► expected cash ──► variance ──► CASH_VARIANCE_HIGH
/// Shift.starting_cash ───────────┘                        ▲
///                                                         │
/// CashDrawerCount.counted ────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use titan_core::money::Money;
    ///
    /// let counted = Money::from_cents(30_000); // $300.00
    /// assert_eq!(counted.cents(), 30_000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal amount received from a caller into cents.
    ///
    /// Rounds half away from zero to the nearest cent. Only request records
    /// call this; arithmetic never goes back through floats.
    ///
    /// ## Example
    /// ```rust
    /// use titan_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(5.00).cents(), 500);
    /// assert_eq!(Money::from_decimal(-30.0).cents(), -3000);
    /// assert_eq!(Money::from_decimal(0.1 + 0.2).cents(), 30);
    /// ```
    pub fn from_decimal(amount: f64) -> Self {
        Money((amount * 100.0).round() as i64)
    }

    /// Converts back to a decimal amount for response records.
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
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

    /// Checks if the value is negative (a shortage when used as variance).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display for logs and issue messages ("-$30.00").
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
