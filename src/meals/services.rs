use std::collections::BTreeSet;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::diff::diff_ids;
use crate::error::{ApiError, ApiResult};
use crate::meals::repo::{self, MealChanges};

/// Insert the meal and one link per distinct recipe id in one transaction.
pub async fn create_meal(
    db: &PgPool,
    user_id: Uuid,
    meal_title: &str,
    meal_time: &str,
    recipe_ids: &[Uuid],
) -> ApiResult<Uuid> {
    let meal_title = meal_title.trim();
    if meal_title.is_empty() {
        return Err(ApiError::Validation("Meal title is required".into()));
    }
    let distinct: Vec<Uuid> = recipe_ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if distinct.is_empty() {
        return Err(ApiError::Validation(
            "A meal needs at least one recipe".into(),
        ));
    }
    check_recipe_ownership(db, user_id, &distinct).await?;

    let meal_id = Uuid::new_v4();
    let mut tx = db.begin().await?;
    repo::insert_tx(&mut tx, meal_id, user_id, meal_title, meal_time).await?;
    for recipe_id in &distinct {
        repo::link_recipe_tx(&mut tx, meal_id, *recipe_id).await?;
    }
    tx.commit().await?;

    info!(user_id = %user_id, meal_id = %meal_id, recipes = distinct.len(), "meal created");
    Ok(meal_id)
}

/// Partial update: only supplied scalar fields change. A supplied recipe set
/// is reconciled by diff, so links for unchanged recipes are never rewritten.
pub async fn update_meal(
    db: &PgPool,
    user_id: Uuid,
    meal_id: Uuid,
    changes: MealChanges,
    recipe_ids: Option<Vec<Uuid>>,
) -> ApiResult<()> {
    let mut tx = db.begin().await?;

    match repo::update_scalars_tx(&mut tx, meal_id, user_id, &changes).await? {
        Some(0) => return Err(ApiError::NotFound),
        Some(_) => {}
        None => {
            // Nothing scalar to update; ownership still has to hold.
            let exists: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM meals WHERE id = $1 AND user_id = $2")
                    .bind(meal_id)
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if exists.is_none() {
                return Err(ApiError::NotFound);
            }
        }
    }

    if let Some(desired) = recipe_ids {
        let desired: Vec<Uuid> = desired.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        if desired.is_empty() {
            return Err(ApiError::Validation(
                "A meal needs at least one recipe".into(),
            ));
        }
        let current = repo::recipe_ids(&mut *tx, meal_id).await?;
        let diff = diff_ids(&current, &desired);

        if !diff.added.is_empty() {
            let added: Vec<Uuid> = diff.added.iter().map(|(id, _)| *id).collect();
            let owned = repo::count_owned_recipes(&mut *tx, user_id, &added).await?;
            if owned != added.len() as i64 {
                return Err(ApiError::Validation("Unknown recipe id".into()));
            }
        }
        for recipe_id in diff.removed {
            repo::unlink_recipe_tx(&mut tx, meal_id, recipe_id).await?;
        }
        for (recipe_id, ()) in diff.added {
            repo::link_recipe_tx(&mut tx, meal_id, recipe_id).await?;
        }
    }

    tx.commit().await?;
    info!(user_id = %user_id, meal_id = %meal_id, "meal updated");
    Ok(())
}

async fn check_recipe_ownership(db: &PgPool, user_id: Uuid, ids: &[Uuid]) -> ApiResult<()> {
    let owned = repo::count_owned_recipes(db, user_id, ids).await?;
    if owned != ids.len() as i64 {
        return Err(ApiError::Validation("Unknown recipe id".into()));
    }
    Ok(())
}
