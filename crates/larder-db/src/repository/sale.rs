//! # Sale Repository
//!
//! Selling dishes debits the kitchen.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Flow                                         │
//! │                                                                         │
//! │  sell(recipe_id, 3)                                                    │
//! │     │                                                                   │
//! │     ├── load recipe + lines            (NotFound)                      │
//! │     ├── requirements(lines, 3)         (Validation: qty ≤ 0)           │
//! │     │                                                                   │
//! │     ▼  BEGIN                                                            │
//! │     ├── adjust_stock(Flour, Kitchen, -6)  ─┐                           │
//! │     ├── adjust_stock(Oil,   Kitchen, -0.12)├─ any refusal → ROLLBACK   │
//! │     ├── INSERT INTO sales                 ─┘                           │
//! │     ▼  COMMIT                                                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each debit is a conditional UPDATE, so two concurrent sales can never both
//! spend the same stock: the second one sees the first one's result.

use chrono::{DateTime, Utc};
use larder_core::recipe::requirements;
use larder_core::report::ReportPeriod;
use larder_core::{Location, SaleRecord};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ingredient::adjust_stock;
use super::recipe::RecipeRepository;
use crate::error::{DbError, DbResult};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Sells `quantity` units of a recipe now.
    ///
    /// ## Errors
    /// * `Validation` - quantity is not positive, or so large the totals overflow
    /// * `NotFound` - no such recipe
    /// * `InsufficientStock` - the first short ingredient; nothing was debited
    pub async fn sell(&self, recipe_id: &str, quantity: i64) -> DbResult<SaleRecord> {
        self.sell_at(recipe_id, quantity, Utc::now()).await
    }

    /// Same as [`SaleRepository::sell`] with an explicit timestamp.
    pub async fn sell_at(
        &self,
        recipe_id: &str,
        quantity: i64,
        sold_at: DateTime<Utc>,
    ) -> DbResult<SaleRecord> {
        debug!(recipe_id = %recipe_id, quantity, "Processing sale");

        let recipe = RecipeRepository::new(self.pool.clone()).get(recipe_id).await?;
        let needed = requirements(&recipe.lines, quantity)?;

        let mut tx = self.pool.begin().await?;

        for (ingredient_id, amount) in &needed {
            if let Err(err) = adjust_stock(&mut *tx, ingredient_id, Location::Kitchen, -*amount).await {
                warn!(
                    recipe = %recipe.name,
                    quantity,
                    error = %err,
                    "Sale refused"
                );
                return Err(err);
            }
        }

        let sale = SaleRecord {
            id: Uuid::new_v4().to_string(),
            recipe_id: recipe.id,
            recipe_name: recipe.name,
            quantity,
            sold_at,
        };

        sqlx::query("INSERT INTO sales (id, recipe_id, quantity, sold_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&sale.id)
            .bind(&sale.recipe_id)
            .bind(sale.quantity)
            .bind(sale.sold_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(DbError::commit_failed)?;

        info!(
            id = %sale.id,
            recipe = %sale.recipe_name,
            quantity,
            ingredients_debited = needed.len(),
            "Sale recorded"
        );
        Ok(sale)
    }

    /// Sales inside `period`, newest first.
    pub async fn list(&self, period: &ReportPeriod) -> DbResult<Vec<SaleRecord>> {
        let sales = sqlx::query_as::<_, SaleRecord>(
            r#"
            SELECT s.id, s.recipe_id, r.name AS recipe_name, s.quantity, s.sold_at
            FROM sales s
            JOIN recipes r ON r.id = s.recipe_id
            WHERE s.sold_at >= ?1 AND s.sold_at < ?2
            ORDER BY s.sold_at DESC
            "#,
        )
        .bind(period.lower_bound())
        .bind(period.upper_bound())
        .fetch_all(&self.pool)
        .await?;

        Ok(sales
            .into_iter()
            .filter(|sale| period.includes(sale.sold_at))
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DbError, ErrorKind};
    use crate::repository::test_support::{flour, ingredient, line, recipe, setup};
    use crate::{Database, DbConfig};
    use chrono::{NaiveTime, TimeZone};
    use larder_core::report::TimeWindow;
    use larder_core::{CoreError, Quantity};

    #[tokio::test]
    async fn test_sell_twice_second_is_refused() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;
        let dish = recipe(&db, "Dish", &[line(&flour, 2)]).await;

        db.sales().sell(&dish.id, 3).await.unwrap();
        let after = db.ingredients().get(&flour.id).await.unwrap();
        assert_eq!(after.kitchen_stock, Quantity::from_units(4));

        let err = db.sales().sell(&dish.id, 3).await.unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientStock {
                available, requested, ..
            }) => {
                assert_eq!(available, Quantity::from_units(4));
                assert_eq!(requested, Quantity::from_units(6));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let after = db.ingredients().get(&flour.id).await.unwrap();
        assert_eq!(after.kitchen_stock, Quantity::from_units(4));

        let today = ReportPeriod::day(Utc::now().date_naive());
        assert_eq!(db.sales().list(&today).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_sale_leaves_every_ingredient_unchanged() {
        let db = setup().await;
        let flour = flour(&db, 100, 0).await;
        let oil = ingredient(&db, "Oil", 1, 0).await;
        let dish = recipe(&db, "Fritter", &[line(&flour, 2), line(&oil, 1)]).await;

        let err = db.sales().sell(&dish.id, 5).await.unwrap_err();
        assert!(err.is_insufficient_stock());

        let flour = db.ingredients().get(&flour.id).await.unwrap();
        let oil = db.ingredients().get(&oil.id).await.unwrap();
        assert_eq!(flour.kitchen_stock, Quantity::from_units(100));
        assert_eq!(oil.kitchen_stock, Quantity::from_units(1));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_sell_validates_quantity_and_recipe() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;
        let dish = recipe(&db, "Dish", &[line(&flour, 2)]).await;

        let err = db.sales().sell(&dish.id, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = db.sales().sell("missing", 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let unchanged = db.ingredients().get(&flour.id).await.unwrap();
        assert_eq!(unchanged.kitchen_stock, Quantity::from_units(10));
    }

    #[tokio::test]
    async fn test_oversized_sale_is_refused_without_effect() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;
        let dish = recipe(&db, "Dish", &[line(&flour, 2)]).await;

        let err = db.sales().sell(&dish.id, (1 << 60) - 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let after = db.ingredients().get(&flour.id).await.unwrap();
        assert_eq!(after.kitchen_stock, Quantity::from_units(10));
        let recorded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(recorded, 0);
    }

    #[tokio::test]
    async fn test_fractional_doses_are_exact() {
        let db = setup().await;
        let oil = ingredient(&db, "Huile", 1, 0).await;
        let dose = larder_core::recipe::RecipeLineInput {
            ingredient_id: oil.id.clone(),
            quantity: Quantity::from_milli(40),
        };
        let dish = recipe(&db, "Alloco", &[dose]).await;

        for _ in 0..25 {
            db.sales().sell(&dish.id, 1).await.unwrap();
        }

        let oil = db.ingredients().get(&oil.id).await.unwrap();
        assert_eq!(oil.kitchen_stock, Quantity::zero());
        assert!(db.sales().sell(&dish.id, 1).await.unwrap_err().is_insufficient_stock());
    }

    #[tokio::test]
    async fn test_list_respects_period_and_time_window() {
        let db = setup().await;
        let flour = flour(&db, 100, 0).await;
        let dish = recipe(&db, "Dish", &[line(&flour, 1)]).await;

        let lunch = Utc.with_ymd_and_hms(2025, 8, 1, 12, 30, 0).unwrap();
        let dinner = Utc.with_ymd_and_hms(2025, 8, 1, 20, 0, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2025, 8, 2, 12, 0, 0).unwrap();
        for at in [lunch, dinner, next_day] {
            db.sales().sell_at(&dish.id, 1, at).await.unwrap();
        }

        let day = chrono::NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let sales = db.sales().list(&ReportPeriod::day(day)).await.unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].sold_at, dinner);
        assert_eq!(sales[0].recipe_name, "Dish");

        let window = TimeWindow::new(
            NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        );
        let lunch_only = ReportPeriod::day(day).with_time_window(window);
        let sales = db.sales().list(&lunch_only).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].sold_at, lunch);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let path = std::env::temp_dir().join(format!("larder-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(4))
            .await
            .unwrap();

        let flour = flour(&db, 10, 0).await;
        let dish = recipe(&db, "Dish", &[line(&flour, 2)]).await;

        let mut handles = Vec::new();
        for _ in 0..12 {
            let sales = db.sales();
            let recipe_id = dish.id.clone();
            handles.push(tokio::spawn(async move { sales.sell(&recipe_id, 1).await }));
        }

        let mut sold = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => sold += 1,
                Err(err) => assert!(err.is_insufficient_stock(), "unexpected error: {err:?}"),
            }
        }

        assert_eq!(sold, 5);
        let flour = db.ingredients().get(&flour.id).await.unwrap();
        assert_eq!(flour.kitchen_stock, Quantity::zero());

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
