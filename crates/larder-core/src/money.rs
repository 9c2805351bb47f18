//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A bar session sums dozens of lines; a cashier variance of             │
//! │  "-0.0000001" is noise nobody should ever have to explain.             │
//! │                                                                         │
//! │  OUR SOLUTION: integer minimal units                                    │
//! │    CFA franc (XOF) has no subdivision: 1 unit = 1 franc                 │
//! │    A currency with cents would store cents                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use larder_core::{Money, Quantity};
//!
//! let price = Money::from_minor(500);        // one soda
//! let sold = Quantity::from_units(25);
//! assert_eq!(price.multiply_quantity(sold).minor(), 12_500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::quantity::{Quantity, MILLI_PER_UNIT};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the currency's smallest unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: Variances are negative when the till is short
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Currency-agnostic**: Display formatting lives in configuration
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Drink.unit_price ──► SessionLine.price_snapshot ──► line expected      │
/// │                                                                         │
/// │  Σ line expected ──► CashSession.expected ──┐                           │
/// │                                             ├──► variance               │
/// │  Cashier declaration ──► CashSession.actual ┘                           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minimal currency units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minimal currency units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

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

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// ## Rounding
    /// The exact product is in thousandths of a minimal unit; it is rounded
    /// half away from zero to a whole minimal unit. Whole quantities never
    /// round.
    ///
    /// ```rust
    /// use larder_core::{Money, Quantity};
    ///
    /// let price = Money::from_minor(600);
    /// assert_eq!(price.multiply_quantity(Quantity::from_milli(1_500)).minor(), 900);
    /// assert_eq!(Money::from_minor(1).multiply_quantity(Quantity::from_milli(500)).minor(), 1);
    /// ```
    pub fn multiply_quantity(&self, qty: Quantity) -> Money {
        // i128 so that large prices × large stock cannot overflow mid-way
        let product = self.0 as i128 * qty.milli() as i128;
        let scale = MILLI_PER_UNIT as i128;
        let half = scale / 2;
        let rounded = if product >= 0 {
            (product + half) / scale
        } else {
            (product - half) / scale
        };
        Money(rounded as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain minimal-unit display. Use `AppConfig::format_money` for symbols.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
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

/// Multiplication by a whole count.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
