//! # larder-core: Pure Business Logic for Larder
//!
//! Larder keeps a restaurant's back office straight: ingredient stock in the
//! kitchen and the storeroom, dishes sold against their recipes, and the bar's
//! cash reconciliation. This crate holds every rule, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Larder Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Route layer / exports (outside this workspace)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               larder-db (Database Layer)                        │   │
//! │  │   repositories, transactions, migrations, config, seed          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ larder-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────┐ │   │
//! │  │   │  ledger  │ │  recipe  │ │reconcile │ │  report  │ │valid.│ │   │
//! │  │   │ 2 places │ │ BOM × n  │ │ bar till │ │ summaries│ │ parse│ │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘ └──────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Ingredient, Recipe, CashSession, ...)
//! - [`quantity`] - Fixed-point stock quantities
//! - [`money`] - Integer money in minimal currency units
//! - [`ledger`] - The never-negative stock rule
//! - [`recipe`] - Recipe requirement resolution
//! - [`reconcile`] - Bar session arithmetic and input defaults
//! - [`report`] - Period summaries
//! - [`validation`] - Parse-and-validate boundary
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use larder_core::recipe::requirements;
//! use larder_core::{Location, Quantity, RecipeLine, StockLevels};
//!
//! let dish = vec![RecipeLine {
//!     ingredient_id: "flour".into(),
//!     ingredient_name: "Flour".into(),
//!     unit: "kg".into(),
//!     quantity: Quantity::from_units(2),
//! }];
//!
//! let needed = requirements(&dish, 3).unwrap()["flour"];
//! let flour = StockLevels::new(Quantity::from_units(10), Quantity::zero());
//!
//! let flour = flour.apply("Flour", Location::Kitchen, -needed).unwrap();
//! assert_eq!(flour.kitchen, Quantity::from_units(4));
//!
//! // A second sale would need 6 kg with 4 left: refused, nothing changes.
//! assert!(flour.apply("Flour", Location::Kitchen, -needed).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod quantity;
pub mod recipe;
pub mod reconcile;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::StockLevels;
pub use money::Money;
pub use quantity::Quantity;
pub use types::*;
