use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    plans::{
        dto::{
            CreatePlanRequest, CreatedResponse, PlanDetails, PlanSummary, ScheduledMeal,
            UpdatePlanRequest,
        },
        repo::{self, PlanChanges},
        services,
    },
    state::AppState,
};

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route(
            "/plans/:id",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
}

#[instrument(skip(state))]
pub async fn list_plans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<PlanSummary>>> {
    let plans = repo::list_by_user(&state.db, user_id).await?;
    Ok(Json(plans.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreatePlanRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let id = services::create_plan(
        &state.db,
        user_id,
        &payload.title,
        &payload.start_date,
        &payload.end_date,
        &payload.goals,
        payload.schedule,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

#[instrument(skip(state))]
pub async fn get_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PlanDetails>> {
    let plan = repo::get(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let meals: Vec<(Uuid, String, String)> = sqlx::query_as(
        r#"
        SELECT m.id, m.meal_title, mpm.scheduled_at
          FROM meals m
          JOIN meal_plan_meals mpm ON mpm.meal_id = m.id
         WHERE mpm.meal_plan_id = $1
         ORDER BY mpm.scheduled_at ASC
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(PlanDetails {
        id: plan.id,
        title: plan.title,
        start_date: plan.start_date,
        end_date: plan.end_date,
        goals: plan.goals,
        meals: meals
            .into_iter()
            .map(|(meal_id, meal_title, scheduled_at)| ScheduledMeal {
                meal_id,
                meal_title,
                scheduled_at,
            })
            .collect(),
        created_at: plan.created_at,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlanRequest>,
) -> ApiResult<StatusCode> {
    let changes = PlanChanges {
        title: payload
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        start_date: payload.start_date,
        end_date: payload.end_date,
        goals: payload.goals,
    };
    services::update_plan(&state.db, user_id, id, changes, payload.schedule).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    services::delete_plan(&state.db, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
