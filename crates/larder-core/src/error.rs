//! # Error Types
//!
//! Domain-specific error types for larder-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  larder-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  larder-db errors (separate crate)                                     │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → route layer             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ingredient, location, amounts)
//! 3. Errors are enum variants, never String
//! 4. A failed operation has no effect; the error says why

use thiserror::Error;

use crate::quantity::Quantity;
use crate::types::Location;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A referenced ingredient, recipe, drink, cashier or session does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A sale or transfer would drive a stock level below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell 3 × "Dish" (2 kg Flour each)
    ///      │
    ///      ▼
    /// Check kitchen Flour: available=4
    ///      │
    ///      ▼
    /// InsufficientStock { ingredient: "Flour", location: Kitchen,
    ///                     available: 4, requested: 6 }
    ///      │
    ///      ▼
    /// Nothing is written, the sale is refused as a whole
    /// ```
    #[error("Insufficient {location} stock for {ingredient}: available {available}, requested {requested}")]
    InsufficientStock {
        ingredient: String,
        location: Location,
        available: Quantity,
        requested: Quantity,
    },

    /// A textual enum value (transfer direction, location) was not recognised.
    #[error("Unknown value for {field}: '{value}'")]
    UnknownEnumValue { field: String, value: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an UnknownEnumValue error.
    pub fn unknown_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        CoreError::UnknownEnumValue {
            field: field.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Raised at the parse boundary before any business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (non-numeric quantity, malformed date, invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (same ingredient twice in a recipe, same drink twice in a session).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },

    /// A range whose start is after its end.
    #[error("{field}: start {start} is after end {end}")]
    InvalidRange {
        field: String,
        start: String,
        end: String,
    },

    /// An operation is refused because other records still depend on this one.
    #[error("{entity} {id} is still referenced by {dependents}")]
    InUse {
        entity: String,
        id: String,
        dependents: String,
    },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    pub fn must_not_be_negative(field: impl Into<String>) -> Self {
        ValidationError::MustNotBeNegative {
            field: field.into(),
        }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            ingredient: "Flour".to_string(),
            location: Location::Kitchen,
            available: Quantity::from_units(4),
            requested: Quantity::from_units(6),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient kitchen stock for Flour: available 4, requested 6"
        );

        let err = CoreError::unknown_value("direction", "sideways");
        assert_eq!(err.to_string(), "Unknown value for direction: 'sideways'");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");
        assert_eq!(
            ValidationError::must_be_positive("quantity").to_string(),
            "quantity must be positive"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("unit").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
