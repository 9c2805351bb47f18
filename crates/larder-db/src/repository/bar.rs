//! # Bar Repositories
//!
//! Drinks, cashiers and drink deliveries. Cash sessions live in
//! [`super::session`].

use chrono::{NaiveDate, Utc};
use larder_core::report::ReportPeriod;
use larder_core::validation::{
    validate_amount, validate_date_range, validate_name, validate_note, validate_positive_quantity,
};
use larder_core::{Cashier, Delivery, Drink, Money, Quantity, ValidationError};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

// =============================================================================
// Drinks
// =============================================================================

const SELECT_DRINK: &str = "SELECT id, name, unit_price, created_at, updated_at FROM drinks";

/// Repository for drink database operations.
#[derive(Debug, Clone)]
pub struct DrinkRepository {
    pool: SqlitePool,
}

impl DrinkRepository {
    /// Creates a new DrinkRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DrinkRepository { pool }
    }

    /// Adds a drink to the bar menu.
    pub async fn create(&self, name: &str, unit_price: Money) -> DbResult<Drink> {
        let name = validate_name("name", name)?;
        validate_amount("unit_price", unit_price)?;
        let now = Utc::now();

        let drink = Drink {
            id: Uuid::new_v4().to_string(),
            name,
            unit_price,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %drink.id, name = %drink.name, "Creating drink");

        sqlx::query(
            "INSERT INTO drinks (id, name, unit_price, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&drink.id)
        .bind(&drink.name)
        .bind(drink.unit_price)
        .bind(drink.created_at)
        .bind(drink.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %drink.id, name = %drink.name, price = %drink.unit_price, "Drink created");
        Ok(drink)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Drink>> {
        let drink = sqlx::query_as::<_, Drink>(&format!("{SELECT_DRINK} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(drink)
    }

    pub async fn get(&self, id: &str) -> DbResult<Drink> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Drink", id))
    }

    /// All drinks, by name.
    pub async fn list(&self) -> DbResult<Vec<Drink>> {
        let drinks = sqlx::query_as::<_, Drink>(&format!("{SELECT_DRINK} ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;

        Ok(drinks)
    }

    /// Renames and/or reprices a drink.
    ///
    /// Closed sessions keep the price they were closed with.
    pub async fn update(&self, id: &str, name: &str, unit_price: Money) -> DbResult<Drink> {
        let name = validate_name("name", name)?;
        validate_amount("unit_price", unit_price)?;

        let result = sqlx::query(
            "UPDATE drinks SET name = ?2, unit_price = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(&name)
        .bind(unit_price)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Drink", id));
        }

        info!(id = %id, price = %unit_price, "Drink updated");
        self.get(id).await
    }

    /// Deletes a drink and its deliveries.
    ///
    /// ## Errors
    /// * `Validation` (`InUse`) - a closed session references the drink
    /// * `NotFound` - no such drink
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting drink");

        let mut tx = self.pool.begin().await?;

        let deliveries = sqlx::query("DELETE FROM deliveries WHERE drink_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let used: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session_lines WHERE drink_id = ?1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if used > 0 {
            warn!(id = %id, sessions = used, "Drink still referenced by sessions");
            return Err(ValidationError::InUse {
                entity: "drink".to_string(),
                id: id.to_string(),
                dependents: format!("{used} session line(s)"),
            }
            .into());
        }

        let result = sqlx::query("DELETE FROM drinks WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Drink", id));
        }

        tx.commit().await.map_err(DbError::commit_failed)?;

        info!(id = %id, deliveries_removed = deliveries.rows_affected(), "Drink deleted");
        Ok(())
    }
}

// =============================================================================
// Cashiers
// =============================================================================

/// Repository for cashier database operations.
#[derive(Debug, Clone)]
pub struct CashierRepository {
    pool: SqlitePool,
}

impl CashierRepository {
    /// Creates a new CashierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashierRepository { pool }
    }

    /// Returns the cashier with this (trimmed) name, creating it if needed.
    pub async fn find_or_create(&self, name: &str) -> DbResult<Cashier> {
        let name = validate_name("cashier_name", name)?;
        let mut conn = self.pool.acquire().await?;
        find_or_create_cashier(&mut *conn, &name).await
    }

    pub async fn list(&self) -> DbResult<Vec<Cashier>> {
        let cashiers =
            sqlx::query_as::<_, Cashier>("SELECT id, name, created_at FROM cashiers ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(cashiers)
    }
}

/// Find-or-create on `conn`; `name` must already be validated.
pub(crate) async fn find_or_create_cashier(
    conn: &mut SqliteConnection,
    name: &str,
) -> DbResult<Cashier> {
    let inserted = sqlx::query(
        "INSERT INTO cashiers (id, name, created_at) VALUES (?1, ?2, ?3) ON CONFLICT(name) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() > 0 {
        info!(name = %name, "Cashier created");
    }

    let cashier =
        sqlx::query_as::<_, Cashier>("SELECT id, name, created_at FROM cashiers WHERE name = ?1")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;

    Ok(cashier)
}

// =============================================================================
// Deliveries
// =============================================================================

const SELECT_DELIVERY: &str = r#"
    SELECT d.id, d.drink_id, dr.name AS drink_name, d.quantity, d.delivered_on,
           d.note, d.created_at
    FROM deliveries d
    JOIN drinks dr ON dr.id = d.drink_id
"#;

/// Repository for drink deliveries.
#[derive(Debug, Clone)]
pub struct DeliveryRepository {
    pool: SqlitePool,
}

impl DeliveryRepository {
    /// Creates a new DeliveryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DeliveryRepository { pool }
    }

    /// Records a delivery of `quantity` units of a drink.
    pub async fn record(
        &self,
        drink_id: &str,
        quantity: Quantity,
        delivered_on: NaiveDate,
        note: Option<&str>,
    ) -> DbResult<Delivery> {
        validate_positive_quantity("quantity", quantity)?;
        let note = validate_note(note)?;

        debug!(drink_id = %drink_id, quantity = %quantity, date = %delivered_on, "Recording delivery");

        let drink = DrinkRepository::new(self.pool.clone()).get(drink_id).await?;

        let delivery = Delivery {
            id: Uuid::new_v4().to_string(),
            drink_id: drink.id,
            drink_name: drink.name,
            quantity,
            delivered_on,
            note,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO deliveries (id, drink_id, quantity, delivered_on, note, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&delivery.id)
        .bind(&delivery.drink_id)
        .bind(delivery.quantity)
        .bind(delivery.delivered_on)
        .bind(&delivery.note)
        .bind(delivery.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %delivery.id, drink = %delivery.drink_name, quantity = %quantity, "Delivery recorded");
        Ok(delivery)
    }

    /// Deliveries dated inside `period`, newest first.
    pub async fn list(&self, period: &ReportPeriod) -> DbResult<Vec<Delivery>> {
        let deliveries = sqlx::query_as::<_, Delivery>(&format!(
            "{SELECT_DELIVERY} WHERE d.delivered_on >= ?1 AND d.delivered_on <= ?2 \
             ORDER BY d.delivered_on DESC, d.created_at DESC"
        ))
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(deliveries)
    }

    /// Total delivered for one drink between `start` and `end`, inclusive.
    pub async fn total_for(&self, drink_id: &str, start: NaiveDate, end: NaiveDate) -> DbResult<Quantity> {
        validate_date_range("period", start, end)?;

        let total: Quantity = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM deliveries
            WHERE drink_id = ?1 AND delivered_on >= ?2 AND delivered_on <= ?3
            "#,
        )
        .bind(drink_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
