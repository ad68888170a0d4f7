use std::collections::BTreeSet;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::ingredients;
use crate::recipes::repo;
use crate::users::services::normalize_list;

pub struct RecipeInput {
    pub name: String,
    pub origin: String,
    pub difficulty: i32,
    pub preparation_time: String,
    pub cooking_time: String,
    pub serving_size: i32,
    pub source: String,
    pub steps: Vec<String>,
    pub ingredients: Vec<String>,
    pub photo: Option<Vec<u8>>,
}

/// Range- and shape-check the input before any write; returns the
/// normalized step and ingredient lists.
pub fn validate(input: &RecipeInput) -> ApiResult<(Vec<String>, Vec<String>)> {
    if input.name.trim().is_empty() {
        return Err(ApiError::Validation("Recipe name is required".into()));
    }
    if !(1..=5).contains(&input.difficulty) {
        return Err(ApiError::Validation(
            "Difficulty must be between 1 and 5".into(),
        ));
    }
    if input.serving_size < 1 {
        return Err(ApiError::Validation("Serving size must be positive".into()));
    }
    let steps = normalize_list(&input.steps);
    if steps.is_empty() {
        return Err(ApiError::Validation(
            "At least one preparation step is required".into(),
        ));
    }
    let ingredients = normalize_list(&input.ingredients);
    if ingredients.is_empty() {
        return Err(ApiError::Validation(
            "At least one ingredient is required".into(),
        ));
    }
    Ok((steps, ingredients))
}

/// Insert the recipe, its numbered steps and its ingredient links in one
/// transaction. Ingredient names resolve find-or-create inside the same
/// transaction, so a failed create leaves no recipe and no new ingredients.
pub async fn create_recipe(db: &PgPool, user_id: Uuid, input: RecipeInput) -> ApiResult<Uuid> {
    let (steps, ingredient_names) = validate(&input)?;

    let recipe_id = Uuid::new_v4();
    let mut tx = db.begin().await?;

    repo::insert_tx(
        &mut tx,
        recipe_id,
        user_id,
        input.name.trim(),
        &input.origin,
        input.difficulty,
        &input.preparation_time,
        &input.cooking_time,
        input.serving_size,
        &input.source,
        input.photo.as_deref(),
    )
    .await?;

    repo::replace_steps_tx(&mut tx, recipe_id, &steps).await?;
    link_ingredients(&mut tx, user_id, recipe_id, &ingredient_names).await?;

    tx.commit().await?;
    info!(user_id = %user_id, recipe_id = %recipe_id, "recipe created");
    Ok(recipe_id)
}

/// Replace the scalar fields, the full step list and the full ingredient
/// link set. A `photo` of `None` keeps the stored photo byte-for-byte.
pub async fn update_recipe(
    db: &PgPool,
    user_id: Uuid,
    recipe_id: Uuid,
    input: RecipeInput,
) -> ApiResult<()> {
    let (steps, ingredient_names) = validate(&input)?;

    let mut tx = db.begin().await?;

    let affected = repo::update_scalars_tx(
        &mut tx,
        recipe_id,
        user_id,
        input.name.trim(),
        &input.origin,
        input.difficulty,
        &input.preparation_time,
        &input.cooking_time,
        input.serving_size,
        &input.source,
        input.photo.as_deref(),
    )
    .await?;
    if affected == 0 {
        return Err(ApiError::NotFound);
    }

    repo::replace_steps_tx(&mut tx, recipe_id, &steps).await?;
    repo::clear_ingredient_links_tx(&mut tx, recipe_id).await?;
    link_ingredients(&mut tx, user_id, recipe_id, &ingredient_names).await?;

    tx.commit().await?;
    info!(user_id = %user_id, recipe_id = %recipe_id, "recipe updated");
    Ok(())
}

/// Resolve each name for this user and link it. Distinct input names can
/// resolve to the same ingredient (substring match), so resolved ids are
/// deduplicated before insertion to satisfy the composite key.
async fn link_ingredients(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    recipe_id: Uuid,
    names: &[String],
) -> ApiResult<()> {
    let mut linked = BTreeSet::new();
    for name in names {
        let ingredient_id = ingredients::repo::resolve_tx(tx, user_id, name).await?;
        if linked.insert(ingredient_id) {
            repo::link_ingredient_tx(tx, recipe_id, ingredient_id, None, None).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> RecipeInput {
        RecipeInput {
            name: "Shakshuka".into(),
            origin: "Tunisia".into(),
            difficulty: 2,
            preparation_time: "10".into(),
            cooking_time: "20".into(),
            serving_size: 2,
            source: "self".into(),
            steps: vec!["Simmer tomatoes".into(), "Crack eggs".into()],
            ingredients: vec!["tomato".into(), "egg".into()],
            photo: None,
        }
    }

    #[test]
    fn valid_input_passes() {
        let (steps, ingredients) = validate(&input()).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(ingredients, vec!["tomato", "egg"]);
    }

    #[test]
    fn difficulty_out_of_range_is_rejected() {
        let mut bad = input();
        bad.difficulty = 6;
        assert!(matches!(validate(&bad), Err(ApiError::Validation(_))));
        bad.difficulty = 0;
        assert!(matches!(validate(&bad), Err(ApiError::Validation(_))));
    }

    #[test]
    fn zero_serving_size_is_rejected() {
        let mut bad = input();
        bad.serving_size = 0;
        assert!(matches!(validate(&bad), Err(ApiError::Validation(_))));
    }

    #[test]
    fn blank_steps_are_rejected() {
        let mut bad = input();
        bad.steps = vec!["   ".into()];
        assert!(matches!(validate(&bad), Err(ApiError::Validation(_))));
    }

    #[test]
    fn empty_ingredient_list_is_rejected() {
        let mut bad = input();
        bad.ingredients.clear();
        assert!(matches!(validate(&bad), Err(ApiError::Validation(_))));
    }

    #[test]
    fn step_order_survives_normalization() {
        let mut ordered = input();
        ordered.steps = vec!["C".into(), " A ".into(), "B".into()];
        let (steps, _) = validate(&ordered).unwrap();
        assert_eq!(steps, vec!["C", "A", "B"]);
    }
}
