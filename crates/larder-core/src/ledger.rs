//! # Inventory Ledger Rules
//!
//! Pure stock arithmetic for the two locations. The database layer enforces
//! the same rule atomically in SQL; this module is the reference it follows
//! and what the route layer can use for previews.
//!
//! ## The One Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock(location) + delta >= 0    otherwise → InsufficientStock          │
//! │                                                                         │
//! │  • checked per location, never across locations                        │
//! │  • a rejected adjustment leaves BOTH levels untouched                  │
//! │  • credits (delta >= 0) always succeed                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::quantity::Quantity;
use crate::types::{Location, TransferDirection};

/// Kitchen and storeroom levels of one ingredient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub kitchen: Quantity,
    pub storeroom: Quantity,
}

impl StockLevels {
    pub const fn new(kitchen: Quantity, storeroom: Quantity) -> Self {
        StockLevels { kitchen, storeroom }
    }

    pub fn get(&self, location: Location) -> Quantity {
        match location {
            Location::Kitchen => self.kitchen,
            Location::Storeroom => self.storeroom,
        }
    }

    fn slot(&mut self, location: Location) -> &mut Quantity {
        match location {
            Location::Kitchen => &mut self.kitchen,
            Location::Storeroom => &mut self.storeroom,
        }
    }

    /// Applies `delta` at `location`, returning the new levels.
    ///
    /// `ingredient` only feeds the error message.
    ///
    /// ```rust
    /// use larder_core::{Location, Quantity, StockLevels};
    ///
    /// let levels = StockLevels::new(Quantity::from_units(10), Quantity::zero());
    /// let after = levels.apply("Flour", Location::Kitchen, Quantity::from_units(-6)).unwrap();
    /// assert_eq!(after.kitchen, Quantity::from_units(4));
    ///
    /// assert!(after.apply("Flour", Location::Kitchen, Quantity::from_units(-6)).is_err());
    /// ```
    pub fn apply(self, ingredient: &str, location: Location, delta: Quantity) -> CoreResult<Self> {
        let available = self.get(location);
        let updated = available.checked_add(delta).ok_or_else(|| {
            if delta.is_positive() {
                CoreError::Validation(ValidationError::invalid_format(
                    "quantity",
                    format!("{ingredient} cannot hold {available} + {delta}"),
                ))
            } else {
                insufficient(ingredient, location, available, delta)
            }
        })?;

        if updated.is_negative() {
            return Err(insufficient(ingredient, location, available, delta));
        }

        let mut next = self;
        *next.slot(location) = updated;
        Ok(next)
    }

    /// Moves `quantity` between locations; both sides change or neither does.
    pub fn transfer(
        self,
        ingredient: &str,
        quantity: Quantity,
        direction: TransferDirection,
    ) -> CoreResult<Self> {
        self.apply(ingredient, direction.source(), -quantity)?
            .apply(ingredient, direction.destination(), quantity)
    }
}

fn insufficient(
    ingredient: &str,
    location: Location,
    available: Quantity,
    delta: Quantity,
) -> CoreError {
    CoreError::InsufficientStock {
        ingredient: ingredient.to_string(),
        location,
        available,
        requested: delta.saturating_neg(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
