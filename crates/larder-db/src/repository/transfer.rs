//! # Transfer Repository
//!
//! Moves stock between the storeroom and the kitchen.
//!
//! A transfer is a debit of the source and a credit of the destination in
//! one transaction, plus a history record carrying the ingredient's name and
//! unit as they were at transfer time.

use chrono::{DateTime, Utc};
use larder_core::report::ReportPeriod;
use larder_core::validation::{validate_positive_quantity, validate_uuid};
use larder_core::{Quantity, TransferDirection, TransferRecord};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ingredient::adjust_stock;
use crate::error::{DbError, DbResult};

const SELECT_TRANSFER: &str = r#"
    SELECT id, ingredient_id, ingredient_name, unit, quantity, direction, transferred_at
    FROM transfers
"#;

/// Repository for transfer database operations.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    /// Creates a new TransferRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransferRepository { pool }
    }

    /// Moves `quantity` of an ingredient in `direction`.
    ///
    /// ## Errors
    /// * `Validation` - quantity is not positive
    /// * `NotFound` - no such ingredient
    /// * `InsufficientStock` - the source holds less than `quantity`
    pub async fn transfer(
        &self,
        ingredient_id: &str,
        quantity: Quantity,
        direction: TransferDirection,
    ) -> DbResult<TransferRecord> {
        self.transfer_at(ingredient_id, quantity, direction, Utc::now()).await
    }

    /// Same as [`TransferRepository::transfer`] with every field as submitted
    /// by a form: the ingredient id, a decimal quantity and the direction's
    /// wire name (`storeroom_to_kitchen` / `kitchen_to_storeroom`).
    ///
    /// ## Errors
    /// * `Validation` - the id is not a UUID or the quantity is not a number
    /// * `UnknownEnumValue` - any other direction text
    ///
    /// Nothing moves on a parse failure.
    pub async fn transfer_str(
        &self,
        ingredient_id: &str,
        quantity: &str,
        direction: &str,
    ) -> DbResult<TransferRecord> {
        validate_uuid("ingredient_id", ingredient_id)?;
        let quantity = Quantity::parse_field("quantity", quantity)?;
        let direction: TransferDirection = direction.parse()?;
        self.transfer(ingredient_id.trim(), quantity, direction).await
    }

    /// Same as [`TransferRepository::transfer`] with an explicit timestamp.
    pub async fn transfer_at(
        &self,
        ingredient_id: &str,
        quantity: Quantity,
        direction: TransferDirection,
        transferred_at: DateTime<Utc>,
    ) -> DbResult<TransferRecord> {
        validate_positive_quantity("quantity", quantity)?;

        debug!(
            ingredient_id = %ingredient_id,
            quantity = %quantity,
            direction = %direction,
            "Processing transfer"
        );

        let mut tx = self.pool.begin().await?;

        let debit = adjust_stock(&mut *tx, ingredient_id, direction.source(), -quantity).await;
        if let Err(err) = debit {
            warn!(ingredient_id = %ingredient_id, direction = %direction, error = %err, "Transfer refused");
            return Err(err);
        }
        adjust_stock(&mut *tx, ingredient_id, direction.destination(), quantity).await?;

        let (ingredient_name, unit): (String, String) =
            sqlx::query_as("SELECT name, unit FROM ingredients WHERE id = ?1")
                .bind(ingredient_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DbError::not_found("Ingredient", ingredient_id))?;

        let record = TransferRecord {
            id: Uuid::new_v4().to_string(),
            ingredient_id: Some(ingredient_id.to_string()),
            ingredient_name,
            unit,
            quantity,
            direction,
            transferred_at,
        };

        sqlx::query(
            r#"
            INSERT INTO transfers (
                id, ingredient_id, ingredient_name, unit, quantity, direction, transferred_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&record.id)
        .bind(&record.ingredient_id)
        .bind(&record.ingredient_name)
        .bind(&record.unit)
        .bind(record.quantity)
        .bind(record.direction)
        .bind(record.transferred_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(DbError::commit_failed)?;

        info!(
            id = %record.id,
            ingredient = %record.ingredient_name,
            quantity = %record.quantity,
            direction = %record.direction,
            "Transfer recorded"
        );
        Ok(record)
    }

    /// Transfer history, newest first, optionally restricted to a period.
    pub async fn history(&self, period: Option<&ReportPeriod>) -> DbResult<Vec<TransferRecord>> {
        let Some(period) = period else {
            let all = sqlx::query_as::<_, TransferRecord>(&format!(
                "{SELECT_TRANSFER} ORDER BY transferred_at DESC"
            ))
            .fetch_all(&self.pool)
            .await?;
            return Ok(all);
        };

        let records = sqlx::query_as::<_, TransferRecord>(&format!(
            "{SELECT_TRANSFER} WHERE transferred_at >= ?1 AND transferred_at < ?2 ORDER BY transferred_at DESC"
        ))
        .bind(period.lower_bound())
        .bind(period.upper_bound())
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .filter(|record| period.includes(record.transferred_at))
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
