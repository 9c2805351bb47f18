//! # Validation Module
//!
//! Input validation for Larder. Everything entering the ledger passes through
//! here first, so core logic only ever sees well-formed values.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Parse boundary (THIS MODULE)                                 │
//! │  ├── Names, units, dates, times, ids                                   │
//! │  └── Sign rules on quantities and amounts                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Core rules (ledger, recipe, reconcile)                       │
//! │  └── Stock sufficiency, duplicate lines, defaults                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0) constraints                                    │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use larder_core::validation::{parse_date, validate_name, validate_sale_quantity};
//!
//! let name = validate_name("name", "  Flour ").unwrap();
//! assert_eq!(name, "Flour");
//! assert!(validate_sale_quantity(0).is_err());
//! assert!(parse_date("date", "2025-08-01").is_ok());
//! ```

use chrono::{NaiveDate, NaiveTime};

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted display name (ingredients, recipes, drinks, cashiers).
pub const MAX_NAME_LEN: usize = 200;

/// Longest accepted unit of measure.
pub const MAX_UNIT_LEN: usize = 20;

/// Longest accepted delivery note.
pub const MAX_NOTE_LEN: usize = 500;

/// Wire format of dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Wire format of times of day.
pub const TIME_FORMAT: &str = "%H:%M";

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name and returns it trimmed.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Validates a unit of measure ("kg", "L", "Unité") and returns it trimmed.
pub fn validate_unit(unit: &str) -> ValidationResult<String> {
    let unit = unit.trim();

    if unit.is_empty() {
        return Err(ValidationError::required("unit"));
    }

    if unit.chars().count() > MAX_UNIT_LEN {
        return Err(ValidationError::TooLong {
            field: "unit".to_string(),
            max: MAX_UNIT_LEN,
        });
    }

    Ok(unit.to_string())
}

/// Normalises an optional free-text note: blank becomes `None`.
pub fn validate_note(note: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if note.chars().count() > MAX_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LEN,
        });
    }

    Ok(Some(note.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the number of dishes in a sale.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Kitchen: Record Sale                                                   │
/// │                                                                         │
/// │  User enters quantity: 3                                               │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_sale_quantity(3) ← THIS FUNCTION                             │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       └── OK → resolve recipe requirements                             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_sale_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }

    Ok(())
}

/// Rejects zero and negative quantities (transfers, deliveries, doses).
pub fn validate_positive_quantity(field: &str, qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::must_be_positive(field));
    }

    Ok(())
}

/// Rejects negative quantities (stock levels, thresholds, session counts).
pub fn validate_non_negative_quantity(field: &str, qty: Quantity) -> ValidationResult<()> {
    if qty.is_negative() {
        return Err(ValidationError::must_not_be_negative(field));
    }

    Ok(())
}

/// Rejects negative amounts. Zero is allowed (free drinks, empty till).
///
/// ```rust
/// use larder_core::validation::validate_amount;
/// use larder_core::Money;
///
/// assert!(validate_amount("unit_price", Money::from_minor(600)).is_ok());
/// assert!(validate_amount("unit_price", Money::zero()).is_ok());
/// assert!(validate_amount("unit_price", Money::from_minor(-1)).is_err());
/// ```
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::must_not_be_negative(field));
    }

    Ok(())
}

// =============================================================================
// Date & Time Validators
// =============================================================================

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(field: &str, input: &str) -> ValidationResult<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::required(field));
    }

    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map_err(|_| ValidationError::invalid_format(field, "expected YYYY-MM-DD"))
}

/// Parses an `HH:MM` time of day.
pub fn parse_time(field: &str, input: &str) -> ValidationResult<NaiveTime> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::required(field));
    }

    NaiveTime::parse_from_str(input, TIME_FORMAT)
        .map_err(|_| ValidationError::invalid_format(field, "expected HH:MM"))
}

/// Checks that `start <= end`.
pub fn validate_date_range(field: &str, start: NaiveDate, end: NaiveDate) -> ValidationResult<()> {
    if start > end {
        return Err(ValidationError::InvalidRange {
            field: field.to_string(),
            start: start.format(DATE_FORMAT).to_string(),
            end: end.format(DATE_FORMAT).to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use larder_core::validation::validate_uuid;
///
/// assert!(validate_uuid("recipe_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("recipe_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id.trim())
        .map_err(|_| ValidationError::invalid_format(field, "must be a valid UUID"))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
