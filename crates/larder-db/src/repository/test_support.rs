//! Fixtures shared by the repository tests.

use larder_core::recipe::RecipeLineInput;
use larder_core::{Drink, Ingredient, Money, Quantity, Recipe};

use super::ingredient::IngredientInput;
use crate::{Database, DbConfig};

pub async fn setup() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub async fn ingredient(db: &Database, name: &str, kitchen: i64, storeroom: i64) -> Ingredient {
    db.ingredients()
        .create(
            &IngredientInput::new(name, "kg")
                .kitchen(Quantity::from_units(kitchen))
                .storeroom(Quantity::from_units(storeroom)),
        )
        .await
        .unwrap()
}

pub async fn flour(db: &Database, kitchen: i64, storeroom: i64) -> Ingredient {
    ingredient(db, "Flour", kitchen, storeroom).await
}

pub fn line(ingredient: &Ingredient, units: i64) -> RecipeLineInput {
    RecipeLineInput {
        ingredient_id: ingredient.id.clone(),
        quantity: Quantity::from_units(units),
    }
}

pub async fn recipe(db: &Database, name: &str, lines: &[RecipeLineInput]) -> Recipe {
    db.recipes().create(name, lines).await.unwrap()
}

pub async fn drink(db: &Database, name: &str, price: i64) -> Drink {
    db.drinks().create(name, Money::from_minor(price)).await.unwrap()
}
