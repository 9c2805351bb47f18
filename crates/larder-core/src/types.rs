//! # Domain Types
//!
//! Core domain types used throughout Larder.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  KITCHEN                                                                │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Ingredient    │◄──│   RecipeLine    │──►│     Recipe      │       │
//! │  │  kitchen_stock  │   │  quantity/unit  │   │  name           │       │
//! │  │  storeroom_stock│   └─────────────────┘   └────────┬────────┘       │
//! │  │  alert_threshold│                                  │                │
//! │  └───────┬─────────┘                         ┌────────▼────────┐       │
//! │          │                                   │   SaleRecord    │       │
//! │  ┌───────▼─────────┐                         │  quantity, when │       │
//! │  │ TransferRecord  │                         └─────────────────┘       │
//! │  │ direction, qty  │                                                    │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  BAR                                                                    │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Drink       │◄──│   SessionLine   │──►│   CashSession   │       │
//! │  │  unit_price     │   │ opening/deliv./ │   │ actual/expected │       │
//! │  └───────┬─────────┘   │ closing, price  │   │ variance        │       │
//! │          │             └─────────────────┘   └────────┬────────┘       │
//! │  ┌───────▼─────────┐                         ┌────────▼────────┐       │
//! │  │    Delivery     │                         │     Cashier     │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are UUID v4 strings. Event records (sales, transfers,
//! deliveries, sessions) are immutable once written.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::ledger::StockLevels;
use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Location
// =============================================================================

/// One of the two places ingredients are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Where dishes are cooked; sales draw from here.
    Kitchen,
    /// Back store; replenishes the kitchen through transfers.
    Storeroom,
}

impl Location {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Location::Kitchen => "kitchen",
            Location::Storeroom => "storeroom",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "kitchen" => Ok(Location::Kitchen),
            "storeroom" => Ok(Location::Storeroom),
            other => Err(CoreError::unknown_value("location", other)),
        }
    }
}

// =============================================================================
// Transfer Direction
// =============================================================================

/// Which way a transfer moves stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    StoreroomToKitchen,
    KitchenToStoreroom,
}

impl TransferDirection {
    /// Location debited by the transfer.
    pub const fn source(&self) -> Location {
        match self {
            TransferDirection::StoreroomToKitchen => Location::Storeroom,
            TransferDirection::KitchenToStoreroom => Location::Kitchen,
        }
    }

    /// Location credited by the transfer.
    pub const fn destination(&self) -> Location {
        match self {
            TransferDirection::StoreroomToKitchen => Location::Kitchen,
            TransferDirection::KitchenToStoreroom => Location::Storeroom,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            TransferDirection::StoreroomToKitchen => "storeroom_to_kitchen",
            TransferDirection::KitchenToStoreroom => "kitchen_to_storeroom",
        }
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse: anything but the two wire names is `UnknownEnumValue`.
impl FromStr for TransferDirection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "storeroom_to_kitchen" => Ok(TransferDirection::StoreroomToKitchen),
            "kitchen_to_storeroom" => Ok(TransferDirection::KitchenToStoreroom),
            other => Err(CoreError::unknown_value("direction", other)),
        }
    }
}

// =============================================================================
// Ingredient
// =============================================================================

/// An ingredient tracked in both locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Ingredient {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name. Not required to be unique.
    pub name: String,

    /// Unit of measure shown next to quantities ("kg", "L", "piece").
    pub unit: String,

    /// Quantity in the kitchen, never negative.
    pub kitchen_stock: Quantity,

    /// Quantity in the storeroom, never negative.
    pub storeroom_stock: Quantity,

    /// Kitchen level under which the ingredient is reported as low.
    pub alert_threshold: Option<Quantity>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    /// Returns the quantity held at `location`.
    pub fn stock(&self, location: Location) -> Quantity {
        match location {
            Location::Kitchen => self.kitchen_stock,
            Location::Storeroom => self.storeroom_stock,
        }
    }

    /// Snapshot of both levels, for ledger arithmetic.
    pub fn stock_levels(&self) -> StockLevels {
        StockLevels::new(self.kitchen_stock, self.storeroom_stock)
    }

    /// True when a threshold is set and the kitchen is strictly under it.
    pub fn is_below_threshold(&self) -> bool {
        self.alert_threshold
            .is_some_and(|threshold| self.kitchen_stock < threshold)
    }
}

// =============================================================================
// Recipe
// =============================================================================

/// A dish and its bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Ingredient doses for one unit sold, loaded separately.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub lines: Vec<RecipeLine>,
}

/// One (ingredient, quantity-per-unit) pair of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RecipeLine {
    pub ingredient_id: String,
    /// Ingredient name at read time (joined, for display).
    pub ingredient_name: String,
    /// Ingredient unit at read time (joined, for display).
    pub unit: String,
    /// Dose for one unit of the recipe.
    pub quantity: Quantity,
}

// =============================================================================
// Sale
// =============================================================================

/// An immutable kitchen sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleRecord {
    pub id: String,
    pub recipe_id: String,
    pub recipe_name: String,
    /// Number of dishes sold (always > 0).
    pub quantity: i64,
    pub sold_at: DateTime<Utc>,
}

// =============================================================================
// Transfer
// =============================================================================

/// An immutable movement of stock between the two locations.
///
/// Name and unit are copied at transfer time so the history stays readable
/// after the ingredient is renamed or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransferRecord {
    pub id: String,
    /// `None` once the ingredient has been deleted.
    pub ingredient_id: Option<String>,
    pub ingredient_name: String,
    pub unit: String,
    pub quantity: Quantity,
    pub direction: TransferDirection,
    pub transferred_at: DateTime<Utc>,
}

// =============================================================================
// Bar
// =============================================================================

/// A drink sold at the bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Drink {
    pub id: String,
    pub name: String,
    /// Current selling price; copied onto session lines at close time.
    pub unit_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Cashier {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A delivery of drinks to the bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Delivery {
    pub id: String,
    pub drink_id: String,
    pub drink_name: String,
    pub quantity: Quantity,
    pub delivered_on: NaiveDate,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A closed bar cash session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashSession {
    pub id: String,
    pub cashier_id: String,
    pub cashier_name: String,
    /// First day covered by the session.
    pub period_start: NaiveDate,
    /// Closing date (last day covered).
    pub closing_date: NaiveDate,
    /// Amount the cashier counted in the till.
    pub declared_actual: Money,
    /// Revenue implied by stock movements.
    pub expected: Money,
    /// `declared_actual - expected`; negative means the till is short.
    pub variance: Money,
    pub created_at: DateTime<Utc>,

    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub lines: Vec<SessionLine>,
}

/// One drink's stock movement within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SessionLine {
    pub drink_id: String,
    pub drink_name: String,
    pub opening: Quantity,
    pub delivered: Quantity,
    pub closing: Quantity,
    /// Drink price when the session was closed. Never updated afterwards.
    pub price_snapshot: Money,
}

impl SessionLine {
    /// `max(0, opening + delivered - closing)`
    pub fn implied_sold(&self) -> Quantity {
        (self.opening + self.delivered - self.closing).non_negative()
    }

    /// Implied sold priced at the snapshot.
    pub fn expected_amount(&self) -> Money {
        self.price_snapshot.multiply_quantity(self.implied_sold())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
