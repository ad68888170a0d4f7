use std::collections::BTreeMap;

use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiResult;

#[derive(Debug, Clone, FromRow)]
pub struct MealPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub goals: String,
    pub created_at: OffsetDateTime,
}

/// Scalar fields of a partial plan update; `None` means "leave untouched".
#[derive(Debug, Default)]
pub struct PlanChanges {
    pub title: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub goals: Option<String>,
}

impl PlanChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.goals.is_none()
    }
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> ApiResult<Vec<MealPlan>> {
    let rows = sqlx::query_as::<_, MealPlan>(
        r#"
        SELECT id, user_id, title, start_date, end_date, goals, created_at
          FROM meal_plans
         WHERE user_id = $1
         ORDER BY start_date DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get<'e>(
    ex: impl PgExecutor<'e>,
    user_id: Uuid,
    plan_id: Uuid,
) -> ApiResult<Option<MealPlan>> {
    let row = sqlx::query_as::<_, MealPlan>(
        r#"
        SELECT id, user_id, title, start_date, end_date, goals, created_at
          FROM meal_plans
         WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(plan_id)
    .bind(user_id)
    .fetch_optional(ex)
    .await?;
    Ok(row)
}

/// Current schedule of a plan as a meal-id → timestamp map.
pub async fn schedule<'e>(
    ex: impl PgExecutor<'e>,
    plan_id: Uuid,
) -> ApiResult<BTreeMap<Uuid, String>> {
    let rows: Vec<(Uuid, String)> = sqlx::query_as(
        "SELECT meal_id, scheduled_at FROM meal_plan_meals WHERE meal_plan_id = $1",
    )
    .bind(plan_id)
    .fetch_all(ex)
    .await?;
    Ok(rows.into_iter().collect())
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    user_id: Uuid,
    title: &str,
    start_date: &str,
    end_date: &str,
    goals: &str,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO meal_plans (id, user_id, title, start_date, end_date, goals)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(plan_id)
    .bind(user_id)
    .bind(title)
    .bind(start_date)
    .bind(end_date)
    .bind(goals)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn link_meal_tx(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    meal_id: Uuid,
    scheduled_at: &str,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO meal_plan_meals (meal_plan_id, meal_id, scheduled_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(plan_id)
    .bind(meal_id)
    .bind(scheduled_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn unlink_meal_tx(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    meal_id: Uuid,
) -> ApiResult<()> {
    sqlx::query("DELETE FROM meal_plan_meals WHERE meal_plan_id = $1 AND meal_id = $2")
        .bind(plan_id)
        .bind(meal_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Patch the schedule timestamp of an existing link only.
pub async fn reschedule_meal_tx(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    meal_id: Uuid,
    scheduled_at: &str,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        UPDATE meal_plan_meals
           SET scheduled_at = $1
         WHERE meal_plan_id = $2 AND meal_id = $3
        "#,
    )
    .bind(scheduled_at)
    .bind(plan_id)
    .bind(meal_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn build_update<'a>(
    changes: &'a PlanChanges,
    plan_id: Uuid,
    user_id: Uuid,
) -> Option<QueryBuilder<'a, Postgres>> {
    if changes.is_empty() {
        return None;
    }
    let mut qb: QueryBuilder<'a, Postgres> = QueryBuilder::new("UPDATE meal_plans SET ");
    let mut fields = qb.separated(", ");
    if let Some(title) = &changes.title {
        fields.push("title = ").push_bind_unseparated(title);
    }
    if let Some(start) = &changes.start_date {
        fields.push("start_date = ").push_bind_unseparated(start);
    }
    if let Some(end) = &changes.end_date {
        fields.push("end_date = ").push_bind_unseparated(end);
    }
    if let Some(goals) = &changes.goals {
        fields.push("goals = ").push_bind_unseparated(goals);
    }
    qb.push(" WHERE id = ")
        .push_bind(plan_id)
        .push(" AND user_id = ")
        .push_bind(user_id);
    Some(qb)
}

/// Apply the partial scalar update; `Ok(None)` means no fields were supplied.
pub async fn update_scalars_tx(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    user_id: Uuid,
    changes: &PlanChanges,
) -> ApiResult<Option<u64>> {
    let Some(mut qb) = build_update(changes, plan_id, user_id) else {
        return Ok(None);
    };
    let res = qb.build().execute(&mut **tx).await?;
    Ok(Some(res.rows_affected()))
}

/// Remove the link rows first, then the plan row.
pub async fn delete_tx(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    user_id: Uuid,
) -> ApiResult<bool> {
    sqlx::query("DELETE FROM meal_plan_meals WHERE meal_plan_id = $1")
        .bind(plan_id)
        .execute(&mut **tx)
        .await?;
    let res = sqlx::query("DELETE FROM meal_plans WHERE id = $1 AND user_id = $2")
        .bind(plan_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// How many of `meal_ids` exist and belong to this user.
pub async fn count_owned_meals<'e>(
    ex: impl PgExecutor<'e>,
    user_id: Uuid,
    meal_ids: &[Uuid],
) -> ApiResult<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM meals WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(meal_ids)
            .fetch_one(ex)
            .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_changes_build_no_update() {
        assert!(build_update(&PlanChanges::default(), Uuid::new_v4(), Uuid::new_v4()).is_none());
    }

    #[test]
    fn update_covers_exactly_the_present_fields() {
        let changes = PlanChanges {
            start_date: Some("2025-06-01".into()),
            goals: Some("eat more greens".into()),
            ..Default::default()
        };
        let qb = build_update(&changes, Uuid::new_v4(), Uuid::new_v4()).unwrap();
        let sql = qb.sql();
        assert!(sql.contains("start_date = $1"));
        assert!(sql.contains("goals = $2"));
        assert!(!sql.contains("title"));
        assert!(!sql.contains("end_date"));
        assert!(sql.contains("WHERE id = $3 AND user_id = $4"));
    }
}
