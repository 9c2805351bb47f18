//! # Recipe Resolver
//!
//! Turns "sell N of this recipe" into "take these quantities out of the
//! kitchen". Pure and read-only.

use std::collections::BTreeMap;

use crate::error::{CoreResult, ValidationError};
use crate::quantity::Quantity;
use crate::types::RecipeLine;
use crate::validation::validate_sale_quantity;

/// Ingredient id → total quantity needed.
pub type Requirements = BTreeMap<String, Quantity>;

/// Scales every line's per-unit dose by `quantity`.
///
/// Lines naming the same ingredient are summed, so a hand-edited recipe with a
/// repeated ingredient still debits the right total.
///
/// ## Errors
/// * `MustBePositive` - `quantity` is zero or negative
/// * `InvalidFormat` - a total would not fit in a `Quantity`
///
/// ```rust
/// use larder_core::recipe::requirements;
/// use larder_core::{Quantity, RecipeLine};
///
/// let lines = vec![RecipeLine {
///     ingredient_id: "flour".into(),
///     ingredient_name: "Flour".into(),
///     unit: "kg".into(),
///     quantity: Quantity::from_units(2),
/// }];
/// let needed = requirements(&lines, 3).unwrap();
/// assert_eq!(needed["flour"], Quantity::from_units(6));
/// ```
pub fn requirements(lines: &[RecipeLine], quantity: i64) -> CoreResult<Requirements> {
    validate_sale_quantity(quantity)?;

    let too_large = || ValidationError::invalid_format("quantity", "needs more stock than can be recorded");

    let mut needed = Requirements::new();
    for line in lines {
        let line_total = line.quantity.checked_times(quantity).ok_or_else(too_large)?;
        let total = needed.entry(line.ingredient_id.clone()).or_default();
        *total = total.checked_add(line_total).ok_or_else(too_large)?;
    }
    Ok(needed)
}

/// A line of a recipe as submitted for create/replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeLineInput {
    pub ingredient_id: String,
    pub quantity: Quantity,
}

/// Checks a submitted bill of materials.
///
/// Every dose must be positive and an ingredient may appear only once.
/// Existence of the ingredients is checked by the database layer.
pub fn validate_lines(lines: &[RecipeLineInput]) -> Result<(), ValidationError> {
    let mut seen = std::collections::HashSet::new();
    for line in lines {
        if line.ingredient_id.trim().is_empty() {
            return Err(ValidationError::required("ingredient_id"));
        }
        if !line.quantity.is_positive() {
            return Err(ValidationError::must_be_positive("recipe line quantity"));
        }
        if !seen.insert(line.ingredient_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "ingredient_id".to_string(),
                value: line.ingredient_id.clone(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
