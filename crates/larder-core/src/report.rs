//! # Reporting Aggregator
//!
//! Read-only summaries over a date range. The database layer fetches the
//! records for the period; the arithmetic lives here so it can be tested
//! without a database.
//!
//! ## Report Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ReportPeriod { start, end, time_window? }                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  larder-db fetches rows in [start 00:00, end+1 00:00)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  THIS MODULE                                                            │
//! │  ├── filters timestamped events by time of day                         │
//! │  ├── groups and sums (sales, transfers, bar, deliveries)               │
//! │  └── lists alert-threshold breaches                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PeriodReport (serde) → CSV/PDF renderers (outside this workspace)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dates are calendar days in UTC. Date-only records (sessions, deliveries)
//! ignore the time window.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{
    CashSession, Delivery, Ingredient, Recipe, SaleRecord, TransferDirection, TransferRecord,
};
use crate::validation::{validate_date_range, ValidationResult};

// =============================================================================
// Period
// =============================================================================

/// Time-of-day restriction, both bounds inclusive.
///
/// When `from > to` the window runs past midnight (18:00 → 02:00), which is
/// how a bar's evening shift reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl TimeWindow {
    pub fn new(from: NaiveTime, to: NaiveTime) -> Self {
        TimeWindow { from, to }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.from <= self.to {
            self.from <= time && time <= self.to
        } else {
            time >= self.from || time <= self.to
        }
    }
}

/// A closed range of calendar days, optionally narrowed to a time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub time_window: Option<TimeWindow>,
}

impl ReportPeriod {
    /// Creates a period, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> ValidationResult<Self> {
        validate_date_range("period", start, end)?;
        Ok(ReportPeriod {
            start,
            end,
            time_window: None,
        })
    }

    /// A single day.
    pub fn day(date: NaiveDate) -> Self {
        ReportPeriod {
            start: date,
            end: date,
            time_window: None,
        }
    }

    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// First instant of the period (inclusive).
    pub fn lower_bound(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// First instant after the period (exclusive).
    pub fn upper_bound(&self) -> DateTime<Utc> {
        let next = self.end.succ_opt().unwrap_or(self.end);
        next.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn includes_date(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Date range and, when set, time window.
    pub fn includes(&self, at: DateTime<Utc>) -> bool {
        let naive = at.naive_utc();
        self.includes_date(naive.date())
            && self
                .time_window
                .map_or(true, |window| window.contains(naive.time()))
    }
}

// =============================================================================
// Stock
// =============================================================================

/// An ingredient whose kitchen level is under its alert threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub ingredient_id: String,
    pub name: String,
    pub unit: String,
    pub kitchen_stock: Quantity,
    pub alert_threshold: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub ingredient_count: usize,
    pub total_kitchen: Quantity,
    pub total_storeroom: Quantity,
    pub alerts: Vec<StockAlert>,
}

/// Threshold breaches (`kitchen < threshold`), in input order.
pub fn low_stock(ingredients: &[Ingredient]) -> Vec<StockAlert> {
    ingredients
        .iter()
        .filter_map(|ingredient| {
            let threshold = ingredient.alert_threshold?;
            ingredient.is_below_threshold().then(|| StockAlert {
                ingredient_id: ingredient.id.clone(),
                name: ingredient.name.clone(),
                unit: ingredient.unit.clone(),
                kitchen_stock: ingredient.kitchen_stock,
                alert_threshold: threshold,
            })
        })
        .collect()
}

pub fn stock_summary(ingredients: &[Ingredient]) -> StockSummary {
    StockSummary {
        ingredient_count: ingredients.len(),
        total_kitchen: ingredients.iter().map(|i| i.kitchen_stock).sum(),
        total_storeroom: ingredients.iter().map(|i| i.storeroom_stock).sum(),
        alerts: low_stock(ingredients),
    }
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSales {
    pub recipe_id: String,
    pub recipe_name: String,
    pub units_sold: i64,
    pub sale_count: usize,
}

/// Ingredient usage implied by the recipes sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientConsumption {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub unit: String,
    pub quantity: Quantity,
}

/// Per-recipe totals, best sellers first.
pub fn sales_by_recipe(sales: &[SaleRecord], period: &ReportPeriod) -> Vec<RecipeSales> {
    let mut totals: BTreeMap<&str, RecipeSales> = BTreeMap::new();

    for sale in sales.iter().filter(|s| period.includes(s.sold_at)) {
        let entry = totals
            .entry(sale.recipe_id.as_str())
            .or_insert_with(|| RecipeSales {
                recipe_id: sale.recipe_id.clone(),
                recipe_name: sale.recipe_name.clone(),
                units_sold: 0,
                sale_count: 0,
            });
        entry.units_sold += sale.quantity;
        entry.sale_count += 1;
    }

    let mut rows: Vec<RecipeSales> = totals.into_values().collect();
    rows.sort_by(|a, b| {
        b.units_sold
            .cmp(&a.units_sold)
            .then_with(|| a.recipe_name.cmp(&b.recipe_name))
    });
    rows
}

/// Expands recipe totals through current bills of materials.
///
/// Recipes no longer present contribute nothing.
pub fn ingredient_consumption(
    sales: &[RecipeSales],
    recipes: &[Recipe],
) -> Vec<IngredientConsumption> {
    let by_id: BTreeMap<&str, &Recipe> = recipes.iter().map(|r| (r.id.as_str(), r)).collect();
    let mut totals: BTreeMap<&str, IngredientConsumption> = BTreeMap::new();

    for sold in sales {
        let Some(recipe) = by_id.get(sold.recipe_id.as_str()) else {
            continue;
        };
        for line in &recipe.lines {
            let entry = totals
                .entry(line.ingredient_id.as_str())
                .or_insert_with(|| IngredientConsumption {
                    ingredient_id: line.ingredient_id.clone(),
                    ingredient_name: line.ingredient_name.clone(),
                    unit: line.unit.clone(),
                    quantity: Quantity::zero(),
                });
            // saturate rather than wrap on absurd totals
            entry.quantity = line
                .quantity
                .checked_times(sold.units_sold)
                .and_then(|used| entry.quantity.checked_add(used))
                .unwrap_or(Quantity::from_milli(i64::MAX));
        }
    }

    let mut rows: Vec<IngredientConsumption> = totals.into_values().collect();
    rows.sort_by(|a, b| a.ingredient_name.cmp(&b.ingredient_name));
    rows
}

// =============================================================================
// Transfers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTotal {
    pub ingredient_id: Option<String>,
    pub ingredient_name: String,
    pub unit: String,
    pub direction: TransferDirection,
    pub quantity: Quantity,
    pub transfer_count: usize,
}

/// Totals per ingredient and direction, by ingredient name.
pub fn transfer_totals(transfers: &[TransferRecord], period: &ReportPeriod) -> Vec<TransferTotal> {
    let mut totals: BTreeMap<(String, Option<String>, TransferDirection), TransferTotal> =
        BTreeMap::new();

    for transfer in transfers.iter().filter(|t| period.includes(t.transferred_at)) {
        let key = (
            transfer.ingredient_name.clone(),
            transfer.ingredient_id.clone(),
            transfer.direction,
        );
        let entry = totals.entry(key).or_insert_with(|| TransferTotal {
            ingredient_id: transfer.ingredient_id.clone(),
            ingredient_name: transfer.ingredient_name.clone(),
            unit: transfer.unit.clone(),
            direction: transfer.direction,
            quantity: Quantity::zero(),
            transfer_count: 0,
        });
        entry.quantity += transfer.quantity;
        entry.transfer_count += 1;
    }

    totals.into_values().collect()
}

// =============================================================================
// Bar
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinkSummary {
    pub drink_id: String,
    pub drink_name: String,
    pub sold: Quantity,
    /// Revenue at each session's price snapshot.
    pub revenue: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTotals {
    pub session_count: usize,
    pub expected: Money,
    pub declared_actual: Money,
    pub variance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarSummary {
    pub drinks: Vec<DrinkSummary>,
    pub totals: SessionTotals,
}

/// Sessions whose closing date falls within the period.
pub fn bar_summary(sessions: &[CashSession], period: &ReportPeriod) -> BarSummary {
    let mut drinks: BTreeMap<&str, DrinkSummary> = BTreeMap::new();
    let mut totals = SessionTotals::default();

    for session in sessions
        .iter()
        .filter(|s| period.includes_date(s.closing_date))
    {
        totals.session_count += 1;
        totals.expected += session.expected;
        totals.declared_actual += session.declared_actual;
        totals.variance += session.variance;

        for line in &session.lines {
            let entry = drinks
                .entry(line.drink_id.as_str())
                .or_insert_with(|| DrinkSummary {
                    drink_id: line.drink_id.clone(),
                    drink_name: line.drink_name.clone(),
                    sold: Quantity::zero(),
                    revenue: Money::zero(),
                });
            entry.sold += line.implied_sold();
            entry.revenue += line.expected_amount();
        }
    }

    let mut drinks: Vec<DrinkSummary> = drinks.into_values().collect();
    drinks.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.drink_name.cmp(&b.drink_name))
    });

    BarSummary { drinks, totals }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTotal {
    pub drink_id: String,
    pub drink_name: String,
    pub quantity: Quantity,
    pub delivery_count: usize,
}

pub fn delivery_totals(deliveries: &[Delivery], period: &ReportPeriod) -> Vec<DeliveryTotal> {
    let mut totals: BTreeMap<&str, DeliveryTotal> = BTreeMap::new();

    for delivery in deliveries
        .iter()
        .filter(|d| period.includes_date(d.delivered_on))
    {
        let entry = totals
            .entry(delivery.drink_id.as_str())
            .or_insert_with(|| DeliveryTotal {
                drink_id: delivery.drink_id.clone(),
                drink_name: delivery.drink_name.clone(),
                quantity: Quantity::zero(),
                delivery_count: 0,
            });
        entry.quantity += delivery.quantity;
        entry.delivery_count += 1;
    }

    let mut rows: Vec<DeliveryTotal> = totals.into_values().collect();
    rows.sort_by(|a, b| a.drink_name.cmp(&b.drink_name));
    rows
}

// =============================================================================
// Period Report
// =============================================================================

/// Everything the CSV/PDF exports show for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub period: ReportPeriod,
    pub stock: StockSummary,
    pub sales: Vec<RecipeSales>,
    pub consumption: Vec<IngredientConsumption>,
    pub transfers: Vec<TransferTotal>,
    pub bar: BarSummary,
    pub deliveries: Vec<DeliveryTotal>,
}

/// Raw rows for a period, as fetched by the storage layer.
#[derive(Debug, Clone, Default)]
pub struct PeriodRecords {
    pub ingredients: Vec<Ingredient>,
    pub recipes: Vec<Recipe>,
    pub sales: Vec<SaleRecord>,
    pub transfers: Vec<TransferRecord>,
    pub sessions: Vec<CashSession>,
    pub deliveries: Vec<Delivery>,
}

impl PeriodReport {
    pub fn build(period: ReportPeriod, records: &PeriodRecords) -> Self {
        let sales = sales_by_recipe(&records.sales, &period);
        let consumption = ingredient_consumption(&sales, &records.recipes);

        PeriodReport {
            period,
            stock: stock_summary(&records.ingredients),
            sales,
            consumption,
            transfers: transfer_totals(&records.transfers, &period),
            bar: bar_summary(&records.sessions, &period),
            deliveries: delivery_totals(&records.deliveries, &period),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecipeLine, SessionLine};
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, d, h, m, 0).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn sale(recipe: &str, quantity: i64, sold_at: DateTime<Utc>) -> SaleRecord {
        SaleRecord {
            id: format!("{recipe}-{sold_at}"),
            recipe_id: recipe.to_string(),
            recipe_name: recipe.to_uppercase(),
            quantity,
            sold_at,
        }
    }

    fn ingredient(id: &str, kitchen: i64, threshold: Option<i64>) -> Ingredient {
        Ingredient {
            id: id.to_string(),
            name: id.to_string(),
            unit: "kg".to_string(),
            kitchen_stock: Quantity::from_units(kitchen),
            storeroom_stock: Quantity::from_units(100),
            alert_threshold: threshold.map(Quantity::from_units),
            created_at: at(1, 0, 0),
            updated_at: at(1, 0, 0),
        }
    }

    #[test]
    fn test_period_rejects_reversed_range() {
        assert!(ReportPeriod::new(day(10), day(1)).is_err());
        assert!(ReportPeriod::new(day(1), day(1)).is_ok());
    }

    #[test]
    fn test_period_bounds_cover_whole_days() {
        let period = ReportPeriod::new(day(1), day(3)).unwrap();
        assert_eq!(period.lower_bound(), at(1, 0, 0));
        assert_eq!(period.upper_bound(), at(4, 0, 0));
        assert!(period.includes(at(3, 23, 59)));
        assert!(!period.includes(at(4, 0, 0)));
    }

    #[test]
    fn test_time_window() {
        let lunch = TimeWindow::new(hm(11, 0), hm(14, 0));
        assert!(lunch.contains(hm(11, 0)));
        assert!(lunch.contains(hm(14, 0)));
        assert!(!lunch.contains(hm(14, 1)));

        let night = TimeWindow::new(hm(18, 0), hm(2, 0));
        assert!(night.contains(hm(23, 30)));
        assert!(night.contains(hm(1, 15)));
        assert!(!night.contains(hm(12, 0)));
    }

    #[test]
    fn test_sales_by_recipe_respects_window() {
        let period = ReportPeriod::new(day(1), day(2))
            .unwrap()
            .with_time_window(TimeWindow::new(hm(11, 0), hm(14, 0)));
        let sales = vec![
            sale("dish", 3, at(1, 12, 0)),
            sale("dish", 2, at(2, 13, 0)),
            sale("dish", 9, at(2, 20, 0)),  // outside window
            sale("soup", 5, at(1, 11, 30)),
            sale("soup", 7, at(5, 12, 0)),  // outside range
        ];

        let rows = sales_by_recipe(&sales, &period);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].recipe_id, "dish");
        assert_eq!(rows[0].units_sold, 5);
        assert_eq!(rows[0].sale_count, 2);
        assert_eq!(rows[1].units_sold, 5);
        assert_eq!(rows[1].recipe_id, "soup");
    }

    #[test]
    fn test_ingredient_consumption() {
        let recipe = Recipe {
            id: "dish".to_string(),
            name: "Dish".to_string(),
            created_at: at(1, 0, 0),
            updated_at: at(1, 0, 0),
            lines: vec![RecipeLine {
                ingredient_id: "flour".to_string(),
                ingredient_name: "Flour".to_string(),
                unit: "kg".to_string(),
                quantity: Quantity::from_units(2),
            }],
        };
        let sold = vec![RecipeSales {
            recipe_id: "dish".to_string(),
            recipe_name: "Dish".to_string(),
            units_sold: 3,
            sale_count: 1,
        }];

        let rows = ingredient_consumption(&sold, &[recipe]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity, Quantity::from_units(6));
    }

    #[test]
    fn test_stock_summary_lists_breaches_only() {
        let ingredients = vec![
            ingredient("flour", 4, Some(5)),
            ingredient("rice", 5, Some(5)),
            ingredient("salt", 0, None),
        ];
        let summary = stock_summary(&ingredients);
        assert_eq!(summary.ingredient_count, 3);
        assert_eq!(summary.total_kitchen, Quantity::from_units(9));
        assert_eq!(summary.total_storeroom, Quantity::from_units(300));
        assert_eq!(summary.alerts.len(), 1);
        assert_eq!(summary.alerts[0].ingredient_id, "flour");
    }

    #[test]
    fn test_transfer_totals_group_by_direction() {
        let period = ReportPeriod::day(day(1));
        let record = |qty: i64, direction: TransferDirection| TransferRecord {
            id: format!("{qty}"),
            ingredient_id: Some("rice".to_string()),
            ingredient_name: "Riz".to_string(),
            unit: "kg".to_string(),
            quantity: Quantity::from_units(qty),
            direction,
            transferred_at: at(1, 9, 0),
        };
        let rows = transfer_totals(
            &[
                record(10, TransferDirection::StoreroomToKitchen),
                record(5, TransferDirection::StoreroomToKitchen),
                record(2, TransferDirection::KitchenToStoreroom),
            ],
            &period,
        );
        assert_eq!(rows.len(), 2);
        let inbound = rows
            .iter()
            .find(|r| r.direction == TransferDirection::StoreroomToKitchen)
            .unwrap();
        assert_eq!(inbound.quantity, Quantity::from_units(15));
        assert_eq!(inbound.transfer_count, 2);
    }

    #[test]
    fn test_bar_summary_uses_snapshots() {
        let line = |price: i64, closing: i64| SessionLine {
            drink_id: "soda".to_string(),
            drink_name: "Soda".to_string(),
            opening: Quantity::from_units(10),
            delivered: Quantity::from_units(20),
            closing: Quantity::from_units(closing),
            price_snapshot: Money::from_minor(price),
        };
        let session = |closing_date: NaiveDate, lines: Vec<SessionLine>, declared: i64| {
            let expected: Money = lines.iter().map(SessionLine::expected_amount).sum();
            CashSession {
                id: format!("{closing_date}"),
                cashier_id: "c".to_string(),
                cashier_name: "Archange".to_string(),
                period_start: closing_date,
                closing_date,
                declared_actual: Money::from_minor(declared),
                expected,
                variance: Money::from_minor(declared) - expected,
                created_at: at(1, 0, 0),
                lines,
            }
        };

        let sessions = vec![
            session(day(1), vec![line(500, 5)], 12_000),
            session(day(2), vec![line(600, 20)], 6_000),
            session(day(9), vec![line(600, 0)], 0),
        ];
        let summary = bar_summary(&sessions, &ReportPeriod::new(day(1), day(7)).unwrap());

        assert_eq!(summary.totals.session_count, 2);
        assert_eq!(summary.totals.expected, Money::from_minor(12_500 + 6_000));
        assert_eq!(summary.totals.variance, Money::from_minor(-500));
        assert_eq!(summary.drinks.len(), 1);
        assert_eq!(summary.drinks[0].sold, Quantity::from_units(35));
        assert_eq!(summary.drinks[0].revenue, Money::from_minor(18_500));
    }

    #[test]
    fn test_delivery_totals() {
        let delivery = |d: u32, qty: i64| Delivery {
            id: format!("{d}-{qty}"),
            drink_id: "soda".to_string(),
            drink_name: "Soda".to_string(),
            quantity: Quantity::from_units(qty),
            delivered_on: day(d),
            note: None,
            created_at: at(d, 8, 0),
        };
        let rows = delivery_totals(
            &[delivery(1, 24), delivery(3, 12), delivery(20, 48)],
            &ReportPeriod::new(day(1), day(7)).unwrap(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity, Quantity::from_units(36));
        assert_eq!(rows[0].delivery_count, 2);
    }
}
