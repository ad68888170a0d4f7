use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    recipes::{
        dto::{CreatedResponse, RecipeDetails, RecipeRequest, RecipeSummary},
        repo, services,
    },
    state::AppState,
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/:id/photo", get(get_photo))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<RecipeSummary>>> {
    let recipes = repo::list_by_user(&state.db, user_id).await?;
    Ok(Json(recipes.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecipeRequest>,
) -> Result<Response, ApiError> {
    // Duplicate names steer the caller to the existing recipe's edit flow
    // instead of a bare failure; the unique constraint still backs this up.
    let name = payload.name.trim().to_string();
    if let Some(existing) = repo::find_id_by_name(&state.db, &name).await? {
        warn!(name = %name, existing = %existing, "recipe name already exists");
        let body = json!({
            "error": {
                "code": "duplicate_name",
                "message": "Recipe with this name already exists",
                "existing_recipe_id": existing,
            }
        });
        return Ok((StatusCode::CONFLICT, Json(body)).into_response());
    }

    let id = services::create_recipe(&state.db, user_id, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })).into_response())
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RecipeDetails>> {
    let recipe = repo::get(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let steps = repo::steps(&state.db, id).await?;
    let ingredients = repo::ingredient_names(&state.db, id).await?;
    Ok(Json(RecipeDetails {
        id: recipe.id,
        name: recipe.name,
        origin: recipe.origin,
        difficulty: recipe.difficulty,
        preparation_time: recipe.preparation_time,
        cooking_time: recipe.cooking_time,
        serving_size: recipe.serving_size,
        source: recipe.source,
        has_photo: recipe.has_photo,
        steps,
        ingredients,
        created_at: recipe.created_at,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipeRequest>,
) -> ApiResult<StatusCode> {
    // A rename must not collide with another recipe.
    let name = payload.name.trim().to_string();
    if let Some(existing) = repo::find_id_by_name(&state.db, &name).await? {
        if existing != id {
            return Err(ApiError::Conflict(
                "Recipe with this name already exists".into(),
            ));
        }
    }
    services::update_recipe(&state.db, user_id, id, payload.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = repo::delete(&state.db, user_id, id).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    info!(user_id = %user_id, recipe_id = %id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = repo::fetch_photo(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)? // no such recipe for this user
        .ok_or(ApiError::NotFound)?; // recipe has no photo
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        photo,
    ))
}
