//! # larder-db: Database Layer for Larder
//!
//! SQLite persistence for the kitchen stock ledger and the bar, using sqlx
//! for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Larder Data Flow                                 │
//! │                                                                         │
//! │  Route layer / seed binary                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     larder-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Ingredients   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Recipes/Sales │    │ 001_initial  │  │   │
//! │  │   │ WAL, FKs on   │    │ Transfers     │    │ _schema.sql  │  │   │
//! │  │   │               │    │ Bar/Sessions  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │          ▲                     │                                │   │
//! │  │          │              larder-core rules                       │   │
//! │  │   AppConfig (config.rs)                                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (larder.db)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Layered application configuration and tracing setup
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use larder_db::{AppConfig, Database};
//! use larder_core::{Quantity, TransferDirection};
//!
//! let config = AppConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! db.transfers()
//!     .transfer(&flour_id, Quantity::from_units(20), TransferDirection::StoreroomToKitchen)
//!     .await?;
//! db.sales().sell(&dish_id, 3).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{init_tracing, AppConfig, ConfigError};
pub use error::{DbError, DbResult, ErrorKind};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bar::{CashierRepository, DeliveryRepository, DrinkRepository};
pub use repository::ingredient::{IngredientInput, IngredientRepository};
pub use repository::recipe::RecipeRepository;
pub use repository::report::ReportRepository;
pub use repository::sale::SaleRepository;
pub use repository::session::SessionRepository;
pub use repository::transfer::TransferRepository;
