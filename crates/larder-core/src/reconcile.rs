//! # Bar Session Reconciliation
//!
//! Works out what the till should hold at the end of a bar session, from
//! stock counts alone, and compares it with what the cashier declared.
//!
//! ## The Arithmetic
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per drink line                                                         │
//! │    sold      = max(0, opening + delivered - closing)                    │
//! │    expected  = sold × price_snapshot                                    │
//! │                                                                         │
//! │  per session                                                            │
//! │    expected  = Σ line expected                                          │
//! │    variance  = declared_actual - expected     (negative = till short)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Defaults
//! ```text
//! opening    omitted → closing count of the latest earlier session (or 0)
//! delivered  omitted → Σ deliveries dated within [period_start, period_end]
//! closing    omitted → rejected: there is no honest default for a count
//! ```
//!
//! The database layer gathers the facts ([`DrinkFacts`]) and persists the
//! result; everything in between happens here.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::SessionLine;
use crate::validation::{
    validate_amount, validate_date_range, validate_name, validate_non_negative_quantity,
    ValidationResult,
};

// =============================================================================
// Input
// =============================================================================

/// One drink's counts as entered at close time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLineInput {
    pub drink_id: String,
    #[serde(default)]
    pub opening: Option<Quantity>,
    #[serde(default)]
    pub delivered: Option<Quantity>,
    #[serde(default)]
    pub closing: Option<Quantity>,
}

/// A request to close a bar session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseSessionInput {
    pub cashier_name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub declared_actual: Money,
    pub lines: Vec<SessionLineInput>,
}

impl CloseSessionInput {
    /// Checks everything that does not need the database.
    ///
    /// Returns the trimmed cashier name.
    pub fn validate(&self) -> ValidationResult<String> {
        let cashier = validate_name("cashier_name", &self.cashier_name)?;
        validate_date_range("period", self.period_start, self.period_end)?;
        validate_amount("declared_actual", self.declared_actual)?;

        if self.lines.is_empty() {
            return Err(ValidationError::required("lines"));
        }

        let mut seen = HashSet::new();
        for line in &self.lines {
            if line.drink_id.trim().is_empty() {
                return Err(ValidationError::required("drink_id"));
            }
            if !seen.insert(line.drink_id.as_str()) {
                return Err(ValidationError::Duplicate {
                    field: "drink_id".to_string(),
                    value: line.drink_id.clone(),
                });
            }
            if let Some(opening) = line.opening {
                validate_non_negative_quantity("opening", opening)?;
            }
            if let Some(delivered) = line.delivered {
                validate_non_negative_quantity("delivered", delivered)?;
            }
            match line.closing {
                Some(closing) => validate_non_negative_quantity("closing", closing)?,
                None => return Err(ValidationError::required("closing")),
            }
        }

        Ok(cashier)
    }
}

// =============================================================================
// Facts & Resolution
// =============================================================================

/// What the database knows about a drink at close time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrinkFacts {
    pub drink_id: String,
    pub drink_name: String,
    /// Current price, becomes the line's snapshot.
    pub unit_price: Money,
    /// Closing count from the latest session before the period, if any.
    pub previous_closing: Option<Quantity>,
    /// Deliveries dated within the period.
    pub delivered_in_period: Quantity,
}

/// Fills in defaults and snapshots the price.
pub fn resolve_line(input: &SessionLineInput, facts: &DrinkFacts) -> ValidationResult<SessionLine> {
    let closing = input
        .closing
        .ok_or_else(|| ValidationError::required("closing"))?;

    let opening = input
        .opening
        .unwrap_or_else(|| facts.previous_closing.unwrap_or_default());
    let delivered = input.delivered.unwrap_or(facts.delivered_in_period);
    if opening.checked_add(delivered).is_none() {
        return Err(ValidationError::invalid_format("delivered", "opening plus delivered is too large"));
    }

    Ok(SessionLine {
        drink_id: facts.drink_id.clone(),
        drink_name: facts.drink_name.clone(),
        opening,
        delivered,
        closing,
        price_snapshot: facts.unit_price,
    })
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Outcome of a session close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub lines: Vec<SessionLine>,
    pub expected: Money,
    pub declared_actual: Money,
    pub variance: Money,
}

/// Sums line expectations and compares with the declared amount.
///
/// ```rust
/// use larder_core::reconcile::reconcile;
/// use larder_core::{Money, Quantity, SessionLine};
///
/// let soda = SessionLine {
///     drink_id: "soda".into(),
///     drink_name: "Soda".into(),
///     opening: Quantity::from_units(10),
///     delivered: Quantity::from_units(20),
///     closing: Quantity::from_units(5),
///     price_snapshot: Money::from_minor(500),
/// };
/// let result = reconcile(vec![soda], Money::from_minor(12_000));
/// assert_eq!(result.expected.minor(), 12_500);
/// assert_eq!(result.variance.minor(), -500);
/// ```
pub fn reconcile(lines: Vec<SessionLine>, declared_actual: Money) -> Reconciliation {
    let expected: Money = lines.iter().map(SessionLine::expected_amount).sum();

    Reconciliation {
        lines,
        expected,
        declared_actual,
        variance: declared_actual - expected,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
