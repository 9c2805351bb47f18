//! # Repository Module
//!
//! Database repository implementations for Larder.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Route handler / seed binary                                           │
//! │       │                                                                 │
//! │       │  db.sales().sell(&dish.id, 3)                                  │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── larder_core::recipe::requirements()   (pure rule)                 │
//! │  └── ingredient::adjust_stock()            (atomic SQL)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Business rules stay in larder-core; repositories own the SQL and     │
//! │  the transaction boundaries.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ingredient::IngredientRepository`] - ingredient CRUD and the stock ledger
//! - [`recipe::RecipeRepository`] - recipes and their lines
//! - [`sale::SaleRepository`] - kitchen sales
//! - [`transfer::TransferRepository`] - storeroom/kitchen transfers
//! - [`bar`] - drinks, cashiers and deliveries
//! - [`session::SessionRepository`] - bar cash sessions
//! - [`report::ReportRepository`] - period reports

pub mod bar;
pub mod ingredient;
pub mod recipe;
pub mod report;
pub mod sale;
pub mod session;
pub mod transfer;

#[cfg(test)]
mod test_support;
