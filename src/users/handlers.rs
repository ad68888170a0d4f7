use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{handlers::is_valid_email, AuthUser},
    error::{ApiError, ApiResult},
    state::AppState,
    users::{
        dto::{ProfileResponse, UpdateProfileRequest},
        repo::User,
        services::{self, normalize_list, ProfileUpdate},
    },
};

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me).delete(delete_me))
        .route("/me/photo", get(get_photo))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let current = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    // Omitted fields keep the stored values.
    let email = payload
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| current.email.clone());
    let user_name = payload
        .user_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| current.user_name.clone());
    let name = payload.name.or_else(|| current.name.clone());
    let cooking_level = payload.cooking_level.unwrap_or(current.cooking_level);
    let dietary_preferences = payload
        .dietary_preferences
        .map(|p| normalize_list(&p))
        .unwrap_or_else(|| current.dietary_preferences.clone());
    let allergies = payload
        .allergies
        .map(|a| normalize_list(&a))
        .unwrap_or_else(|| current.allergies.clone());

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if !(1..=5).contains(&cooking_level) {
        return Err(ApiError::Validation(
            "Cooking level must be between 1 and 5".into(),
        ));
    }
    if email != current.email {
        if let Some(owner) = User::find_by_email(&state.db, &email).await? {
            if owner.id != user_id {
                return Err(ApiError::Conflict("Email already in use".into()));
            }
        }
    }
    if user_name != current.user_name {
        if let Some(owner) = User::find_by_user_name(&state.db, &user_name).await? {
            if owner.id != user_id {
                return Err(ApiError::Conflict("User name already in use".into()));
            }
        }
    }

    services::update_profile(
        &state.db,
        user_id,
        ProfileUpdate {
            email,
            user_name,
            name,
            cooking_level,
            dietary_preferences,
            allergies,
            photo_data: payload.photo.map(|b| b.into_vec()),
        },
    )
    .await?;

    let updated = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<StatusCode> {
    // Child rows, recipes, meals and plans all go with the user via cascade.
    let deleted = User::delete_by_id(&state.db, user_id).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    info!(user_id = %user_id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let photo = user.photo_data.ok_or(ApiError::NotFound)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        photo,
    ))
}
