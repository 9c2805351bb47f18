//! # Quantity Module
//!
//! Fixed-point stock quantities.
//!
//! ## Why Fixed Point?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM, KITCHEN EDITION                            │
//! │                                                                         │
//! │  Recipe uses 0.1 kg onion per dish, kitchen holds 0.3 kg:              │
//! │    0.3 - 0.1 - 0.1 - 0.1 = 5.55e-17 in f64, or worse -2.7e-17          │
//! │    → "negative stock" after three perfectly valid sales                │
//! │                                                                         │
//! │  OUR SOLUTION: integer thousandths                                      │
//! │    300 - 100 - 100 - 100 = 0, exactly                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every quantity in the ledger (kg, L, g, pieces, bottles) is a `Quantity`
//! holding thousandths of its unit. Three decimals cover the finest recipe
//! doses seen in practice (0.01 kg of salt, 0.04 L of oil).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;

/// Number of thousandths in one unit.
pub const MILLI_PER_UNIT: i64 = 1_000;

/// Maximum number of decimal places accepted when parsing.
const MAX_DECIMALS: usize = 3;

/// A quantity of some unit, in thousandths.
///
/// Serialised as the raw number of thousandths.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from thousandths of a unit.
    ///
    /// ```rust
    /// use larder_core::Quantity;
    ///
    /// let oil = Quantity::from_milli(40); // 0.04 L
    /// assert_eq!(oil.to_string(), "0.04");
    /// ```
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * MILLI_PER_UNIT)
    }

    /// Returns the raw value in thousandths.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
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

    /// Returns `self` clamped at zero from below.
    #[inline]
    pub fn non_negative(self) -> Self {
        Quantity(self.0.max(0))
    }

    /// Multiplies by a whole count (recipe dose × dishes sold).
    #[inline]
    pub const fn times(&self, count: i64) -> Self {
        Quantity(self.0 * count)
    }

    /// Checked multiplication by a whole count, `None` on overflow.
    pub fn checked_times(self, count: i64) -> Option<Quantity> {
        self.0.checked_mul(count).map(Quantity)
    }

    /// Checked addition, `None` on overflow.
    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }

    /// Negation that clamps `i64::MIN` instead of overflowing.
    #[inline]
    pub fn saturating_neg(self) -> Quantity {
        Quantity(self.0.saturating_neg())
    }

    /// Parses a quantity entered by a user, naming the offending field on error.
    ///
    /// Accepts an optional sign, digits, and up to three decimals after a `.`.
    pub fn parse_field(field: &str, input: &str) -> Result<Quantity, ValidationError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ValidationError::required(field));
        }

        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (digits, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(ValidationError::invalid_format(field, "not a number"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationError::invalid_format(field, "not a number"));
        }
        if frac.len() > MAX_DECIMALS {
            return Err(ValidationError::invalid_format(
                field,
                format!("at most {MAX_DECIMALS} decimal places"),
            ));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| ValidationError::invalid_format(field, "number too large"))?
        };
        let mut frac_value: i64 = 0;
        for (i, c) in frac.chars().enumerate() {
            let digit = i64::from(c as u8 - b'0');
            frac_value += digit * 10_i64.pow((MAX_DECIMALS - 1 - i) as u32);
        }

        let milli = whole_value
            .checked_mul(MILLI_PER_UNIT)
            .and_then(|m| m.checked_add(frac_value))
            .ok_or_else(|| ValidationError::invalid_format(field, "number too large"))?;

        Ok(Quantity(if negative { -milli } else { milli }))
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::parse_field("quantity", s)
    }
}

/// Shows the shortest exact decimal form: `4`, `0.04`, `-1.5`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / MILLI_PER_UNIT as u64;
        let frac = abs % MILLI_PER_UNIT as u64;

        if frac == 0 {
            return write!(f, "{sign}{whole}");
        }

        let frac = format!("{frac:03}");
        write!(f, "{sign}{whole}.{}", frac.trim_end_matches('0'))
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

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

impl Mul<i64> for Quantity {
    type Output = Self;

    #[inline]
    fn mul(self, count: i64) -> Self {
        self.times(count)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), |acc, q| acc + q)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
