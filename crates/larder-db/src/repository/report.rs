//! # Report Repository
//!
//! Fetches the rows a period report needs; the arithmetic lives in
//! `larder_core::report`.
//!
//! Every query here is a plain read, so reports can run while sales and
//! transfers are being written (WAL readers never block the writer).

use larder_core::report::{stock_summary, PeriodRecords, PeriodReport, ReportPeriod, StockAlert, StockSummary};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::bar::DeliveryRepository;
use super::ingredient::IngredientRepository;
use super::recipe::RecipeRepository;
use super::sale::SaleRepository;
use super::session::SessionRepository;
use super::transfer::TransferRepository;
use crate::error::DbResult;

/// Read-only reporting over the whole database.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Builds the full report for `period`.
    ///
    /// Stock figures are current levels; everything else is restricted to
    /// the period (and its time window, for timestamped events).
    pub async fn period_report(&self, period: ReportPeriod) -> DbResult<PeriodReport> {
        debug!(start = %period.start, end = %period.end, "Building period report");

        let records = PeriodRecords {
            ingredients: IngredientRepository::new(self.pool.clone()).list().await?,
            recipes: RecipeRepository::new(self.pool.clone()).list().await?,
            sales: SaleRepository::new(self.pool.clone()).list(&period).await?,
            transfers: TransferRepository::new(self.pool.clone())
                .history(Some(&period))
                .await?,
            sessions: SessionRepository::new(self.pool.clone())
                .list(Some(&period))
                .await?,
            deliveries: DeliveryRepository::new(self.pool.clone()).list(&period).await?,
        };

        let report = PeriodReport::build(period, &records);

        info!(
            sales = records.sales.len(),
            transfers = records.transfers.len(),
            sessions = records.sessions.len(),
            "Period report built"
        );
        Ok(report)
    }

    /// Current totals across all ingredients, with alert breaches.
    pub async fn stock_summary(&self) -> DbResult<StockSummary> {
        let ingredients = IngredientRepository::new(self.pool.clone()).list().await?;
        Ok(stock_summary(&ingredients))
    }

    /// Ingredients whose kitchen level is under their alert threshold.
    pub async fn low_stock(&self) -> DbResult<Vec<StockAlert>> {
        IngredientRepository::new(self.pool.clone()).low_stock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::ingredient::IngredientInput;
    use crate::repository::test_support::{drink, flour, ingredient, line, recipe, setup};
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use larder_core::reconcile::{CloseSessionInput, SessionLineInput};
    use larder_core::report::TimeWindow;
    use larder_core::{Money, Quantity, TransferDirection};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    #[tokio::test]
    async fn test_period_report_end_to_end() {
        let db = setup().await;
        let flour = flour(&db, 10, 20).await;
        let oil = ingredient(&db, "Oil", 5, 0).await;
        let dish = recipe(&db, "Dish", &[line(&flour, 2), line(&oil, 1)]).await;
        let soda = drink(&db, "Soda", 500).await;

        let noon = |d| Utc.with_ymd_and_hms(2025, 8, d, 12, 0, 0).unwrap();
        db.sales().sell_at(&dish.id, 2, noon(1)).await.unwrap();
        db.sales().sell_at(&dish.id, 1, noon(2)).await.unwrap();
        db.sales().sell_at(&dish.id, 1, noon(20)).await.unwrap();
        db.transfers()
            .transfer_at(&flour.id, Quantity::from_units(5), TransferDirection::StoreroomToKitchen, noon(2))
            .await
            .unwrap();
        db.deliveries()
            .record(&soda.id, Quantity::from_units(20), day(1), None)
            .await
            .unwrap();
        db.sessions()
            .close(&CloseSessionInput {
                cashier_name: "Archange".to_string(),
                period_start: day(1),
                period_end: day(2),
                declared_actual: Money::from_minor(12_000),
                lines: vec![SessionLineInput {
                    drink_id: soda.id.clone(),
                    opening: Some(Quantity::from_units(10)),
                    delivered: None,
                    closing: Some(Quantity::from_units(5)),
                }],
            })
            .await
            .unwrap();

        let period = ReportPeriod::new(day(1), day(7)).unwrap();
        let report = db.reports().period_report(period).await.unwrap();

        assert_eq!(report.sales.len(), 1);
        assert_eq!(report.sales[0].units_sold, 3);
        assert_eq!(report.sales[0].sale_count, 2);

        let flour_used = report
            .consumption
            .iter()
            .find(|c| c.ingredient_id == flour.id)
            .unwrap();
        assert_eq!(flour_used.quantity, Quantity::from_units(6));

        assert_eq!(report.transfers.len(), 1);
        assert_eq!(report.transfers[0].quantity, Quantity::from_units(5));

        assert_eq!(report.bar.totals.session_count, 1);
        assert_eq!(report.bar.totals.expected, Money::from_minor(12_500));
        assert_eq!(report.bar.totals.variance, Money::from_minor(-500));
        assert_eq!(report.bar.drinks[0].sold, Quantity::from_units(25));

        assert_eq!(report.deliveries.len(), 1);
        assert_eq!(report.deliveries[0].quantity, Quantity::from_units(20));

        assert_eq!(report.stock.ingredient_count, 2);
        // 10 + 5 transferred - 8 sold
        let flour = db.ingredients().get(&flour.id).await.unwrap();
        assert_eq!(flour.kitchen_stock, Quantity::from_units(7));
    }

    #[tokio::test]
    async fn test_time_window_restricts_sales() {
        let db = setup().await;
        let flour = flour(&db, 100, 0).await;
        let dish = recipe(&db, "Dish", &[line(&flour, 1)]).await;

        let at = |h| Utc.with_ymd_and_hms(2025, 8, 1, h, 0, 0).unwrap();
        db.sales().sell_at(&dish.id, 1, at(9)).await.unwrap();
        db.sales().sell_at(&dish.id, 4, at(22)).await.unwrap();

        let night = TimeWindow::new(
            NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
        );
        let period = ReportPeriod::day(day(1)).with_time_window(night);
        let report = db.reports().period_report(period).await.unwrap();

        assert_eq!(report.sales.len(), 1);
        assert_eq!(report.sales[0].units_sold, 4);
    }

    #[tokio::test]
    async fn test_stock_summary_and_low_stock() {
        let db = setup().await;
        db.ingredients()
            .create(
                &IngredientInput::new("Sel", "kg")
                    .kitchen(Quantity::from_milli(500))
                    .alert_at(Quantity::from_units(1)),
            )
            .await
            .unwrap();
        flour(&db, 10, 20).await;

        let summary = db.reports().stock_summary().await.unwrap();
        assert_eq!(summary.ingredient_count, 2);
        assert_eq!(summary.total_kitchen, Quantity::from_milli(10_500));
        assert_eq!(summary.total_storeroom, Quantity::from_units(20));
        assert_eq!(summary.alerts.len(), 1);

        let low = db.reports().low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Sel");
    }
}
