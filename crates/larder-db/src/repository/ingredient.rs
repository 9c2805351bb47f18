//! # Ingredient Repository
//!
//! The ingredient catalogue and the two-location stock ledger.
//!
//! ## Atomic Adjustment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read, decide in Rust, write back                            │
//! │     SELECT kitchen_stock ...      -- two sales both read 10            │
//! │     UPDATE ... SET kitchen_stock = 4                                   │
//! │     UPDATE ... SET kitchen_stock = 4   → 12 kg vanished into 6         │
//! │                                                                         │
//! │  ✅ CORRECT: one conditional delta                                      │
//! │     UPDATE ingredients                                                  │
//! │        SET kitchen_stock = kitchen_stock + Δ                           │
//! │      WHERE id = ? AND kitchen_stock + Δ >= 0                           │
//! │     RETURNING kitchen_stock                                             │
//! │                                                                         │
//! │  No row back → either the ingredient is gone (NotFound) or the level   │
//! │  is too low (InsufficientStock). Nothing was written either way.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use larder_core::report::{low_stock, StockAlert};
use larder_core::validation::{validate_name, validate_non_negative_quantity, validate_unit};
use larder_core::{CoreError, Ingredient, Location, Quantity, ValidationError};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const SELECT_INGREDIENT: &str = r#"
    SELECT id, name, unit, kitchen_stock, storeroom_stock, alert_threshold,
           created_at, updated_at
    FROM ingredients
"#;

/// Fields of an ingredient as entered on the stock screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientInput {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub kitchen_stock: Quantity,
    #[serde(default)]
    pub storeroom_stock: Quantity,
    #[serde(default)]
    pub alert_threshold: Option<Quantity>,
}

impl IngredientInput {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        IngredientInput {
            name: name.into(),
            unit: unit.into(),
            kitchen_stock: Quantity::zero(),
            storeroom_stock: Quantity::zero(),
            alert_threshold: None,
        }
    }

    pub fn kitchen(mut self, qty: Quantity) -> Self {
        self.kitchen_stock = qty;
        self
    }

    pub fn storeroom(mut self, qty: Quantity) -> Self {
        self.storeroom_stock = qty;
        self
    }

    pub fn alert_at(mut self, threshold: Quantity) -> Self {
        self.alert_threshold = Some(threshold);
        self
    }

    /// Returns a trimmed copy, or the first rule it breaks.
    fn validated(&self) -> Result<IngredientInput, ValidationError> {
        validate_non_negative_quantity("kitchen_stock", self.kitchen_stock)?;
        validate_non_negative_quantity("storeroom_stock", self.storeroom_stock)?;
        if let Some(threshold) = self.alert_threshold {
            validate_non_negative_quantity("alert_threshold", threshold)?;
        }

        Ok(IngredientInput {
            name: validate_name("name", &self.name)?,
            unit: validate_unit(&self.unit)?,
            ..self.clone()
        })
    }
}

/// Repository for ingredient database operations.
#[derive(Debug, Clone)]
pub struct IngredientRepository {
    pool: SqlitePool,
}

impl IngredientRepository {
    /// Creates a new IngredientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        IngredientRepository { pool }
    }

    /// Adds an ingredient to the catalogue.
    ///
    /// Names are not unique: two suppliers' "Poisson Sylvie 2000" can coexist.
    pub async fn create(&self, input: &IngredientInput) -> DbResult<Ingredient> {
        let input = input.validated()?;
        let now = Utc::now();

        let ingredient = Ingredient {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            unit: input.unit,
            kitchen_stock: input.kitchen_stock,
            storeroom_stock: input.storeroom_stock,
            alert_threshold: input.alert_threshold,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %ingredient.id, name = %ingredient.name, "Creating ingredient");

        sqlx::query(
            r#"
            INSERT INTO ingredients (
                id, name, unit, kitchen_stock, storeroom_stock, alert_threshold,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&ingredient.id)
        .bind(&ingredient.name)
        .bind(&ingredient.unit)
        .bind(ingredient.kitchen_stock)
        .bind(ingredient.storeroom_stock)
        .bind(ingredient.alert_threshold)
        .bind(ingredient.created_at)
        .bind(ingredient.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %ingredient.id, name = %ingredient.name, "Ingredient created");
        Ok(ingredient)
    }

    /// Gets an ingredient by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Ingredient>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(&format!("{SELECT_INGREDIENT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ingredient)
    }

    /// Gets an ingredient by ID, `NotFound` if it does not exist.
    pub async fn get(&self, id: &str) -> DbResult<Ingredient> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Ingredient", id))
    }

    /// All ingredients, by name.
    pub async fn list(&self) -> DbResult<Vec<Ingredient>> {
        let ingredients =
            sqlx::query_as::<_, Ingredient>(&format!("{SELECT_INGREDIENT} ORDER BY name, created_at"))
                .fetch_all(&self.pool)
                .await?;

        Ok(ingredients)
    }

    /// Replaces every editable field, including the stock counts.
    ///
    /// Stock counts set here are corrections after a physical count; day to
    /// day movements go through sales and transfers.
    pub async fn update(&self, id: &str, input: &IngredientInput) -> DbResult<Ingredient> {
        let input = input.validated()?;
        let now = Utc::now();

        debug!(id = %id, "Updating ingredient");

        let result = sqlx::query(
            r#"
            UPDATE ingredients SET
                name = ?2,
                unit = ?3,
                kitchen_stock = ?4,
                storeroom_stock = ?5,
                alert_threshold = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.unit)
        .bind(input.kitchen_stock)
        .bind(input.storeroom_stock)
        .bind(input.alert_threshold)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ingredient", id));
        }

        info!(id = %id, "Ingredient updated");
        self.get(id).await
    }

    /// Applies `delta` to one location, atomically.
    ///
    /// ## Returns
    /// The ingredient after the change.
    ///
    /// ## Errors
    /// * `NotFound` - no such ingredient
    /// * `InsufficientStock` - the level would go below zero; nothing changed
    /// * `Validation` - the level would exceed the largest storable quantity
    pub async fn adjust(&self, id: &str, location: Location, delta: Quantity) -> DbResult<Ingredient> {
        let mut conn = self.pool.acquire().await?;
        adjust_stock(&mut *conn, id, location, delta).await?;
        drop(conn);

        self.get(id).await
    }

    /// Deletes an ingredient.
    ///
    /// In one transaction: its recipe lines go, its transfer history is
    /// detached (keeping the name/unit snapshot), then the row goes.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting ingredient");

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE transfers SET ingredient_id = NULL WHERE ingredient_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let lines = sqlx::query("DELETE FROM recipe_lines WHERE ingredient_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM ingredients WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ingredient", id));
        }

        tx.commit().await.map_err(DbError::commit_failed)?;

        info!(
            id = %id,
            recipe_lines_removed = lines.rows_affected(),
            "Ingredient deleted"
        );
        Ok(())
    }

    /// Ingredients whose kitchen level is strictly under their threshold.
    pub async fn low_stock(&self) -> DbResult<Vec<StockAlert>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(&format!(
            "{SELECT_INGREDIENT} WHERE alert_threshold IS NOT NULL AND kitchen_stock < alert_threshold ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(low_stock(&ingredients))
    }

    /// Counts ingredients (for diagnostics and the seed check).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingredients")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn stock_column(location: Location) -> &'static str {
    match location {
        Location::Kitchen => "kitchen_stock",
        Location::Storeroom => "storeroom_stock",
    }
}

/// The ledger primitive: one conditional UPDATE on `conn`.
///
/// Runs on whatever connection it is given, so sales and transfers can chain
/// several adjustments inside their own transaction.
pub(crate) async fn adjust_stock(
    conn: &mut SqliteConnection,
    id: &str,
    location: Location,
    delta: Quantity,
) -> DbResult<Quantity> {
    let column = stock_column(location);
    debug!(id = %id, location = %location, delta = %delta, "Adjusting stock");

    // SQLite turns an overflowing integer sum into REAL, so the upper bound
    // is checked before the addition rather than after it.
    let sql = format!(
        "UPDATE ingredients SET {column} = {column} + ?2, updated_at = ?3 \
         WHERE id = ?1 AND {column} + ?2 >= 0 \
           AND (?2 <= 0 OR {column} <= 9223372036854775807 - ?2) \
         RETURNING {column}"
    );
    let updated: Option<Quantity> = sqlx::query_scalar(&sql)
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(level) = updated {
        return Ok(level);
    }

    let current: Option<(String, Quantity)> =
        sqlx::query_as(&format!("SELECT name, {column} FROM ingredients WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    match current {
        None => Err(DbError::not_found("Ingredient", id)),
        Some((name, available)) if delta.is_positive() => {
            warn!(
                id = %id,
                ingredient = %name,
                location = %location,
                available = %available,
                delta = %delta,
                "Stock credit would overflow"
            );
            Err(CoreError::Validation(ValidationError::invalid_format(
                "quantity",
                format!("{name} cannot hold {available} + {delta}"),
            ))
            .into())
        }
        Some((name, available)) => {
            let requested = delta.saturating_neg();
            warn!(
                id = %id,
                ingredient = %name,
                location = %location,
                available = %available,
                requested = %requested,
                "Stock adjustment refused"
            );
            Err(CoreError::InsufficientStock {
                ingredient: name,
                location,
                available,
                requested,
            }
            .into())
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::repository::test_support::{flour, ingredient, setup};
    use larder_core::recipe::RecipeLineInput;
    use larder_core::{StockLevels, TransferDirection};
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let db = setup().await;
        let repo = db.ingredients();

        let created = repo
            .create(
                &IngredientInput::new("  Riz ", "kg")
                    .storeroom(Quantity::from_units(1000))
                    .alert_at(Quantity::from_units(5)),
            )
            .await
            .unwrap();
        assert_eq!(created.name, "Riz");

        let fetched = repo.get(&created.id).await.unwrap();
        assert_eq!(fetched.storeroom_stock, Quantity::from_units(1000));
        assert_eq!(fetched.alert_threshold, Some(Quantity::from_units(5)));
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let db = setup().await;
        let repo = db.ingredients();

        let err = repo.create(&IngredientInput::new("", "kg")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = repo
            .create(&IngredientInput::new("Riz", "kg").kitchen(Quantity::from_units(-1)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_names_are_allowed() {
        let db = setup().await;
        let repo = db.ingredients();
        repo.create(&IngredientInput::new("Poisson Sylvie 2000", "Unité")).await.unwrap();
        repo.create(&IngredientInput::new("Poisson Sylvie 2000", "Unité")).await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_adjust_debit_and_credit() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;
        let repo = db.ingredients();

        let after = repo
            .adjust(&flour.id, Location::Kitchen, Quantity::from_units(-4))
            .await
            .unwrap();
        assert_eq!(after.kitchen_stock, Quantity::from_units(6));

        let after = repo
            .adjust(&flour.id, Location::Storeroom, Quantity::from_milli(2_500))
            .await
            .unwrap();
        assert_eq!(after.storeroom_stock, Quantity::from_milli(2_500));
    }

    #[tokio::test]
    async fn test_adjust_refuses_negative_and_changes_nothing() {
        let db = setup().await;
        let flour = flour(&db, 4, 0).await;
        let repo = db.ingredients();

        let err = repo
            .adjust(&flour.id, Location::Kitchen, Quantity::from_units(-6))
            .await
            .unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientStock {
                ingredient,
                location,
                available,
                requested,
            }) => {
                assert_eq!(ingredient, "Flour");
                assert_eq!(location, Location::Kitchen);
                assert_eq!(available, Quantity::from_units(4));
                assert_eq!(requested, Quantity::from_units(6));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let unchanged = repo.get(&flour.id).await.unwrap();
        assert_eq!(unchanged.kitchen_stock, Quantity::from_units(4));
    }

    #[tokio::test]
    async fn test_adjust_unknown_ingredient() {
        let db = setup().await;
        let err = db
            .ingredients()
            .adjust("missing", Location::Kitchen, Quantity::from_units(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_adjust_refuses_credit_past_the_storable_maximum() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;
        let repo = db.ingredients();

        let err = repo
            .adjust(&flour.id, Location::Kitchen, Quantity::from_milli(i64::MAX - 5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // the row still decodes and holds what it held
        let after = repo.get(&flour.id).await.unwrap();
        assert_eq!(after.kitchen_stock, Quantity::from_units(10));
        assert_eq!(repo.list().await.unwrap().len(), 1);

        let top = Quantity::from_milli(i64::MAX - Quantity::from_units(10).milli());
        let full = repo.adjust(&flour.id, Location::Kitchen, top).await.unwrap();
        assert_eq!(full.kitchen_stock, Quantity::from_milli(i64::MAX));
    }

    #[tokio::test]
    async fn test_adjust_with_extreme_debit_is_refused() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;

        let err = db
            .ingredients()
            .adjust(&flour.id, Location::Kitchen, Quantity::from_milli(i64::MIN))
            .await
            .unwrap_err();
        assert!(err.is_insufficient_stock());
        assert_eq!(
            db.ingredients().get(&flour.id).await.unwrap().kitchen_stock,
            Quantity::from_units(10)
        );
    }

    #[tokio::test]
    async fn test_update_sets_and_clears_threshold() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;
        let repo = db.ingredients();

        let input = IngredientInput::new("Farine", "kg")
            .kitchen(Quantity::from_units(3))
            .alert_at(Quantity::from_units(5));
        let updated = repo.update(&flour.id, &input).await.unwrap();
        assert_eq!(updated.name, "Farine");
        assert!(updated.is_below_threshold());
        assert_eq!(repo.low_stock().await.unwrap().len(), 1);

        let cleared = repo
            .update(&flour.id, &IngredientInput::new("Farine", "kg"))
            .await
            .unwrap();
        assert_eq!(cleared.alert_threshold, None);
        assert!(repo.low_stock().await.unwrap().is_empty());

        let err = repo.update("missing", &input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_missing_ingredient() {
        let db = setup().await;
        let err = db.ingredients().delete("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // =========================================================================
    // Randomised ledger sequences
    // =========================================================================

    #[derive(Debug, Clone)]
    enum LedgerOp {
        Sell(i64),
        Transfer { oil: bool, milli: i64, to_kitchen: bool },
        Adjust { oil: bool, kitchen: bool, milli: i64 },
    }

    fn ledger_op() -> impl Strategy<Value = LedgerOp> {
        prop_oneof![
            (1i64..4).prop_map(LedgerOp::Sell),
            (any::<bool>(), 1i64..6_000, any::<bool>())
                .prop_map(|(oil, milli, to_kitchen)| LedgerOp::Transfer { oil, milli, to_kitchen }),
            (any::<bool>(), any::<bool>(), -6_000i64..6_000)
                .prop_map(|(oil, kitchen, milli)| LedgerOp::Adjust { oil, kitchen, milli }),
        ]
    }

    /// Replays `ops` through the repositories and checks every step against
    /// the pure `StockLevels` rules.
    async fn replay(ops: Vec<LedgerOp>) {
        let db = setup().await;
        let flour = ingredient(&db, "Flour", 3, 6).await;
        let oil = ingredient(&db, "Oil", 1, 2).await;
        let dish = db
            .recipes()
            .create(
                "Dish",
                &[
                    RecipeLineInput {
                        ingredient_id: flour.id.clone(),
                        quantity: Quantity::from_milli(1_500),
                    },
                    RecipeLineInput {
                        ingredient_id: oil.id.clone(),
                        quantity: Quantity::from_milli(250),
                    },
                ],
            )
            .await
            .unwrap();

        let ids = [flour.id.clone(), oil.id.clone()];
        let mut model: [StockLevels; 2] = [flour.stock_levels(), oil.stock_levels()];

        for op in &ops {
            let (outcome, expected) = match *op {
                LedgerOp::Sell(n) => {
                    let outcome = db.sales().sell(&dish.id, n).await.map(|_| ());
                    let expected = model[0]
                        .apply("Flour", Location::Kitchen, Quantity::from_milli(-1_500 * n))
                        .and_then(|f| {
                            let o = model[1].apply("Oil", Location::Kitchen, Quantity::from_milli(-250 * n))?;
                            Ok([f, o])
                        });
                    (outcome, expected)
                }
                LedgerOp::Transfer { oil, milli, to_kitchen } => {
                    let i = usize::from(oil);
                    let qty = Quantity::from_milli(milli);
                    let direction = if to_kitchen {
                        TransferDirection::StoreroomToKitchen
                    } else {
                        TransferDirection::KitchenToStoreroom
                    };
                    let outcome = db.transfers().transfer(&ids[i], qty, direction).await.map(|_| ());
                    let expected = model[i].transfer("x", qty, direction).map(|levels| {
                        let mut next = model;
                        next[i] = levels;
                        next
                    });
                    (outcome, expected)
                }
                LedgerOp::Adjust { oil, kitchen, milli } => {
                    let i = usize::from(oil);
                    let location = if kitchen { Location::Kitchen } else { Location::Storeroom };
                    let delta = Quantity::from_milli(milli);
                    let outcome = db.ingredients().adjust(&ids[i], location, delta).await.map(|_| ());
                    let expected = model[i].apply("x", location, delta).map(|levels| {
                        let mut next = model;
                        next[i] = levels;
                        next
                    });
                    (outcome, expected)
                }
            };

            match (outcome, expected) {
                (Ok(()), Ok(next)) => model = next,
                (Err(err), Err(_)) => assert!(err.is_insufficient_stock(), "{op:?}: {err:?}"),
                (outcome, expected) => panic!("{op:?}: database {outcome:?}, rules {expected:?}"),
            }

            for (id, levels) in ids.iter().zip(model) {
                let stored = db.ingredients().get(id).await.unwrap().stock_levels();
                assert_eq!(stored, levels, "after {op:?}");
                assert!(!stored.kitchen.is_negative() && !stored.storeroom.is_negative());
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_stored_levels_follow_the_ledger_rules(
            ops in proptest::collection::vec(ledger_op(), 1..40),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(replay(ops));
        }
    }
}
