//! # Money Module
//!
//! Provides the `Money` type for monetary amounts, plus rounding helpers for
//! fractional unit-cost rates.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every monetary AMOUNT (price, line total, discount, payment,         │
//! │    cost price, audit gain/loss) is an i64 number of cents.              │
//! │                                                                         │
//! │  THE EXCEPTION: Unit-cost RATES                                         │
//! │    Cost-per-gram is routinely sub-cent (flour at $2.00/kg is           │
//! │    $0.002/g). Rates stay f64 and are rounded to 4 decimal places at    │
//! │    persistence boundaries; they become integer cents the moment they   │
//! │    are multiplied into an amount.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values are legal (write-off valuations, losses)
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a fractional currency amount into cents, rounding half away
    /// from zero. This is the single place where f64 amounts become Money.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// assert_eq!(Money::from_f64(0.5).cents(), 50);
    /// assert_eq!(Money::from_f64(0.005).cents(), 1);
    /// assert_eq!(Money::from_f64(f64::NAN).cents(), 0);
    /// ```
    pub fn from_f64(amount: f64) -> Self {
        if !amount.is_finite() {
            return Money(0);
        }
        Money((amount * 100.0).round() as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value as fractional currency units (display / rate math).
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the larger of self and `other`.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// Returns the smaller of self and `other`.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// Clamps to zero from below: negative amounts become zero.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-50).floor_zero().cents(), 0);
    /// assert_eq!(Money::from_cents(50).floor_zero().cents(), 50);
    /// ```
    #[inline]
    pub fn floor_zero(self) -> Self {
        Money(self.0.max(0))
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Computes `pct_bps` basis points of this amount, rounded half up.
    ///
    /// Used for percentage discounts: 1000 bps = 10%.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(10000); // $100.00
    /// assert_eq!(subtotal.percentage(1000).cents(), 1000); // 10% = $10.00
    /// ```
    pub fn percentage(&self, pct_bps: u32) -> Money {
        // i128 to prevent overflow on large amounts
        let part = (self.0 as i128 * pct_bps as i128 + 5000) / 10000;
        Money(part as i64)
    }
}

// =============================================================================
// Rate Rounding
// =============================================================================

/// Rounds a unit-cost rate (money per gram/ml/piece) to 4 decimal places.
///
/// Rates carry more precision than amounts: a per-gram cost of $0.0023 must
/// not collapse to $0.00. Non-finite input normalizes to 0.
///
/// ## Example
/// ```rust
/// use mesa_core::money::round_rate;
///
/// assert_eq!(round_rate(0.00234), 0.0023);
/// assert_eq!(round_rate(f64::INFINITY), 0.0);
/// ```
pub fn round_rate(rate: f64) -> f64 {
    if !rate.is_finite() {
        return 0.0;
    }
    (rate * 10_000.0).round() / 10_000.0
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
/// For debugging and logs; UI formatting is out of scope.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
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

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
