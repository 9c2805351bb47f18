//! # Recipe Repository
//!
//! Recipes and their bills of materials.
//!
//! A recipe owns its lines: replacing the lines or deleting the recipe
//! happens in one transaction, so readers never see a half-edited recipe.

use std::collections::HashMap;

use chrono::Utc;
use larder_core::recipe::{validate_lines, RecipeLineInput};
use larder_core::validation::validate_name;
use larder_core::{Quantity, Recipe, RecipeLine};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const SELECT_LINES: &str = r#"
    SELECT rl.recipe_id, rl.ingredient_id, i.name AS ingredient_name, i.unit, rl.quantity
    FROM recipe_lines rl
    JOIN ingredients i ON i.id = rl.ingredient_id
"#;

#[derive(FromRow)]
struct LineRow {
    recipe_id: String,
    ingredient_id: String,
    ingredient_name: String,
    unit: String,
    quantity: Quantity,
}

impl From<LineRow> for RecipeLine {
    fn from(row: LineRow) -> Self {
        RecipeLine {
            ingredient_id: row.ingredient_id,
            ingredient_name: row.ingredient_name,
            unit: row.unit,
            quantity: row.quantity,
        }
    }
}

/// Repository for recipe database operations.
#[derive(Debug, Clone)]
pub struct RecipeRepository {
    pool: SqlitePool,
}

impl RecipeRepository {
    /// Creates a new RecipeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RecipeRepository { pool }
    }

    /// Creates a recipe with its lines.
    ///
    /// ## Errors
    /// * `Validation` - empty name, non-positive dose, ingredient listed twice
    /// * `NotFound` - a line names an ingredient that does not exist
    pub async fn create(&self, name: &str, lines: &[RecipeLineInput]) -> DbResult<Recipe> {
        let name = validate_name("name", name)?;
        validate_lines(lines)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, name = %name, lines = lines.len(), "Creating recipe");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO recipes (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        )
        .bind(&id)
        .bind(&name)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_lines(&mut *tx, &id, lines).await?;

        tx.commit().await.map_err(DbError::commit_failed)?;

        info!(id = %id, name = %name, "Recipe created");
        self.get(&id).await
    }

    /// Gets a recipe with its lines, `None` if it does not exist.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(
            "SELECT id, name, created_at, updated_at FROM recipes WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut recipe) = recipe else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, LineRow>(&format!(
            "{SELECT_LINES} WHERE rl.recipe_id = ?1 ORDER BY rl.position"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        recipe.lines = rows.into_iter().map(RecipeLine::from).collect();
        Ok(Some(recipe))
    }

    /// Gets a recipe with its lines, `NotFound` if it does not exist.
    pub async fn get(&self, id: &str) -> DbResult<Recipe> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Recipe", id))
    }

    /// All recipes by name, each with its lines.
    pub async fn list(&self) -> DbResult<Vec<Recipe>> {
        let mut recipes = sqlx::query_as::<_, Recipe>(
            "SELECT id, name, created_at, updated_at FROM recipes ORDER BY name, created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, LineRow>(&format!(
            "{SELECT_LINES} ORDER BY rl.recipe_id, rl.position"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut by_recipe: HashMap<String, Vec<RecipeLine>> = HashMap::new();
        for row in rows {
            by_recipe
                .entry(row.recipe_id.clone())
                .or_default()
                .push(row.into());
        }

        for recipe in &mut recipes {
            recipe.lines = by_recipe.remove(&recipe.id).unwrap_or_default();
        }

        Ok(recipes)
    }

    /// Renames a recipe and replaces all of its lines.
    ///
    /// All or nothing: if any new line is rejected the old lines stay.
    pub async fn replace(&self, id: &str, name: &str, lines: &[RecipeLineInput]) -> DbResult<Recipe> {
        let name = validate_name("name", name)?;
        validate_lines(lines)?;

        debug!(id = %id, name = %name, lines = lines.len(), "Replacing recipe");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE recipes SET name = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(&name)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Recipe", id));
        }

        sqlx::query("DELETE FROM recipe_lines WHERE recipe_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_lines(&mut *tx, id, lines).await?;

        tx.commit().await.map_err(DbError::commit_failed)?;

        info!(id = %id, name = %name, "Recipe replaced");
        self.get(id).await
    }

    /// Deletes a recipe, its lines and its sale history.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting recipe");

        let mut tx = self.pool.begin().await?;

        let sales = sqlx::query("DELETE FROM sales WHERE recipe_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM recipe_lines WHERE recipe_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM recipes WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Recipe", id));
        }

        tx.commit().await.map_err(DbError::commit_failed)?;

        info!(id = %id, sales_removed = sales.rows_affected(), "Recipe deleted");
        Ok(())
    }
}

async fn insert_lines(
    conn: &mut SqliteConnection,
    recipe_id: &str,
    lines: &[RecipeLineInput],
) -> DbResult<()> {
    for (position, line) in lines.iter().enumerate() {
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM ingredients WHERE id = ?1")
            .bind(&line.ingredient_id)
            .fetch_optional(&mut *conn)
            .await?;

        if exists.is_none() {
            return Err(DbError::not_found("Ingredient", &line.ingredient_id));
        }

        sqlx::query(
            r#"
            INSERT INTO recipe_lines (recipe_id, ingredient_id, quantity, position)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(recipe_id)
        .bind(&line.ingredient_id)
        .bind(line.quantity)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::repository::test_support::{flour, ingredient, line, recipe, setup};
    use std::collections::BTreeMap;

    fn pairs(recipe: &Recipe) -> BTreeMap<String, Quantity> {
        recipe
            .lines
            .iter()
            .map(|l| (l.ingredient_id.clone(), l.quantity))
            .collect()
    }

    #[tokio::test]
    async fn test_round_trip_ignores_line_order() {
        let db = setup().await;
        let i1 = ingredient(&db, "Riz", 10, 0).await;
        let i2 = ingredient(&db, "Huile", 10, 0).await;

        let forward = recipe(&db, "A", &[line(&i1, 2), line(&i2, 3)]).await;
        let backward = recipe(&db, "B", &[line(&i2, 3), line(&i1, 2)]).await;

        let forward = db.recipes().get(&forward.id).await.unwrap();
        let backward = db.recipes().get(&backward.id).await.unwrap();
        assert_eq!(pairs(&forward), pairs(&backward));
        assert_eq!(pairs(&forward).len(), 2);
        assert_eq!(forward.lines[0].ingredient_name, "Riz");
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_ingredient_and_writes_nothing() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;
        let bad = RecipeLineInput {
            ingredient_id: "missing".to_string(),
            quantity: Quantity::from_units(1),
        };

        let err = db
            .recipes()
            .create("Dish", &[line(&flour, 2), bad])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(db.recipes().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_and_non_positive_lines() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;

        let err = db
            .recipes()
            .create("Dish", &[line(&flour, 2), line(&flour, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = db.recipes().create("Dish", &[line(&flour, 0)]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_replace_is_all_or_nothing() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;
        let oil = ingredient(&db, "Oil", 10, 0).await;
        let dish = recipe(&db, "Dish", &[line(&flour, 2)]).await;

        let bad = RecipeLineInput {
            ingredient_id: "missing".to_string(),
            quantity: Quantity::from_units(1),
        };
        let err = db
            .recipes()
            .replace(&dish.id, "Dish v2", &[line(&oil, 1), bad])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let unchanged = db.recipes().get(&dish.id).await.unwrap();
        assert_eq!(unchanged.name, "Dish");
        assert_eq!(pairs(&unchanged), pairs(&dish));

        let replaced = db
            .recipes()
            .replace(&dish.id, "Dish v2", &[line(&oil, 1)])
            .await
            .unwrap();
        assert_eq!(replaced.name, "Dish v2");
        assert_eq!(replaced.lines.len(), 1);
        assert_eq!(replaced.lines[0].ingredient_id, oil.id);
    }

    #[tokio::test]
    async fn test_list_attaches_lines() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;
        recipe(&db, "Bread", &[line(&flour, 1)]).await;
        recipe(&db, "Air", &[]).await;

        let recipes = db.recipes().list().await.unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].name, "Air");
        assert!(recipes[0].lines.is_empty());
        assert_eq!(recipes[1].lines.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_lines_and_sales() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;
        let dish = recipe(&db, "Dish", &[line(&flour, 2)]).await;
        db.sales().sell(&dish.id, 1).await.unwrap();

        db.recipes().delete(&dish.id).await.unwrap();

        assert!(db.recipes().get_by_id(&dish.id).await.unwrap().is_none());
        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipe_lines")
            .fetch_one(db.pool())
            .await
            .unwrap();
        let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!((lines, sales), (0, 0));

        let err = db.recipes().delete(&dish.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_deleting_ingredient_removes_its_lines() {
        let db = setup().await;
        let flour = flour(&db, 10, 0).await;
        let oil = ingredient(&db, "Oil", 10, 0).await;
        let dish = recipe(&db, "Dish", &[line(&flour, 2), line(&oil, 1)]).await;

        db.ingredients().delete(&flour.id).await.unwrap();

        let dish = db.recipes().get(&dish.id).await.unwrap();
        assert_eq!(dish.lines.len(), 1);
        assert_eq!(dish.lines[0].ingredient_id, oil.id);
    }
}
