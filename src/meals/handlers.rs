use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    meals::{
        dto::{
            CreateMealRequest, CreatedResponse, MealDetails, MealRecipeSummary, MealSummary,
            UpdateMealRequest,
        },
        repo::{self, MealChanges},
        services,
    },
    state::AppState,
};

pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals).post(create_meal))
        .route(
            "/meals/:id",
            get(get_meal).put(update_meal).delete(delete_meal),
        )
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<MealSummary>>> {
    let meals = repo::list_by_user(&state.db, user_id).await?;
    Ok(Json(meals.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateMealRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let id = services::create_meal(
        &state.db,
        user_id,
        &payload.meal_title,
        &payload.meal_time,
        &payload.recipe_ids,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MealDetails>> {
    let meal = repo::get(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let recipes: Vec<(Uuid, String)> = sqlx::query_as(
        r#"
        SELECT r.id, r.name
          FROM recipes r
          JOIN meal_recipes mr ON mr.recipe_id = r.id
         WHERE mr.meal_id = $1
         ORDER BY r.name
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    let ingredients: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT i.name
          FROM ingredients i
          JOIN recipe_ingredients ri ON ri.ingredient_id = i.id
          JOIN meal_recipes mr ON mr.recipe_id = ri.recipe_id
         WHERE mr.meal_id = $1
         ORDER BY i.name
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(MealDetails {
        id: meal.id,
        meal_title: meal.meal_title,
        meal_time: meal.meal_time,
        recipes: recipes
            .into_iter()
            .map(|(id, name)| MealRecipeSummary { id, name })
            .collect(),
        ingredients: ingredients.into_iter().map(|(n,)| n).collect(),
        created_at: meal.created_at,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMealRequest>,
) -> ApiResult<StatusCode> {
    let changes = MealChanges {
        meal_title: payload
            .meal_title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        meal_time: payload.meal_time,
    };
    services::update_meal(&state.db, user_id, id, changes, payload.recipe_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = repo::delete(&state.db, user_id, id).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    info!(user_id = %user_id, meal_id = %id, "meal deleted");
    Ok(StatusCode::NO_CONTENT)
}
