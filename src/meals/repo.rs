use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiResult;

#[derive(Debug, Clone, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_title: String,
    pub meal_time: String,
    pub created_at: OffsetDateTime,
}

/// Scalar fields of a partial meal update; `None` means "leave untouched".
#[derive(Debug, Default)]
pub struct MealChanges {
    pub meal_title: Option<String>,
    pub meal_time: Option<String>,
}

impl MealChanges {
    pub fn is_empty(&self) -> bool {
        self.meal_title.is_none() && self.meal_time.is_none()
    }
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> ApiResult<Vec<Meal>> {
    let rows = sqlx::query_as::<_, Meal>(
        r#"
        SELECT id, user_id, meal_title, meal_time, created_at
          FROM meals
         WHERE user_id = $1
         ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> ApiResult<Option<Meal>> {
    let row = sqlx::query_as::<_, Meal>(
        r#"
        SELECT id, user_id, meal_title, meal_time, created_at
          FROM meals
         WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(meal_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn recipe_ids<'e>(ex: impl PgExecutor<'e>, meal_id: Uuid) -> ApiResult<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT recipe_id FROM meal_recipes WHERE meal_id = $1")
            .bind(meal_id)
            .fetch_all(ex)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    user_id: Uuid,
    meal_title: &str,
    meal_time: &str,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO meals (id, user_id, meal_title, meal_time)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(meal_id)
    .bind(user_id)
    .bind(meal_title)
    .bind(meal_time)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn link_recipe_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    recipe_id: Uuid,
) -> ApiResult<()> {
    sqlx::query("INSERT INTO meal_recipes (meal_id, recipe_id) VALUES ($1, $2)")
        .bind(meal_id)
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn unlink_recipe_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    recipe_id: Uuid,
) -> ApiResult<()> {
    sqlx::query("DELETE FROM meal_recipes WHERE meal_id = $1 AND recipe_id = $2")
        .bind(meal_id)
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// One parameterized UPDATE covering exactly the supplied fields.
/// Returns `None` when there is nothing to update.
fn build_update<'a>(
    changes: &'a MealChanges,
    meal_id: Uuid,
    user_id: Uuid,
) -> Option<QueryBuilder<'a, Postgres>> {
    if changes.is_empty() {
        return None;
    }
    let mut qb: QueryBuilder<'a, Postgres> = QueryBuilder::new("UPDATE meals SET ");
    let mut fields = qb.separated(", ");
    if let Some(title) = &changes.meal_title {
        fields.push("meal_title = ").push_bind_unseparated(title);
    }
    if let Some(time) = &changes.meal_time {
        fields.push("meal_time = ").push_bind_unseparated(time);
    }
    qb.push(" WHERE id = ")
        .push_bind(meal_id)
        .push(" AND user_id = ")
        .push_bind(user_id);
    Some(qb)
}

/// Apply the partial scalar update; `Ok(None)` means no fields were supplied.
pub async fn update_scalars_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    user_id: Uuid,
    changes: &MealChanges,
) -> ApiResult<Option<u64>> {
    let Some(mut qb) = build_update(changes, meal_id, user_id) else {
        return Ok(None);
    };
    let res = qb.build().execute(&mut **tx).await?;
    Ok(Some(res.rows_affected()))
}

pub async fn delete(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> ApiResult<bool> {
    let res = sqlx::query("DELETE FROM meals WHERE id = $1 AND user_id = $2")
        .bind(meal_id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// How many of `recipe_ids` exist and belong to this user.
pub async fn count_owned_recipes<'e>(
    ex: impl PgExecutor<'e>,
    user_id: Uuid,
    recipe_ids: &[Uuid],
) -> ApiResult<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM recipes WHERE user_id = $1 AND id = ANY($2)",
    )
    .bind(user_id)
    .bind(recipe_ids)
    .fetch_one(ex)
    .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_changes_build_no_update() {
        let changes = MealChanges::default();
        assert!(build_update(&changes, Uuid::new_v4(), Uuid::new_v4()).is_none());
    }

    #[test]
    fn single_field_update_covers_only_that_field() {
        let changes = MealChanges {
            meal_time: Some("Lunch".into()),
            ..Default::default()
        };
        let qb = build_update(&changes, Uuid::new_v4(), Uuid::new_v4()).unwrap();
        let sql = qb.sql();
        assert!(sql.contains("meal_time = $1"));
        assert!(!sql.contains("meal_title"));
        assert!(sql.contains("WHERE id = $2 AND user_id = $3"));
    }

    #[test]
    fn both_fields_update_covers_both() {
        let changes = MealChanges {
            meal_title: Some("Brunch".into()),
            meal_time: Some("Late morning".into()),
        };
        let qb = build_update(&changes, Uuid::new_v4(), Uuid::new_v4()).unwrap();
        let sql = qb.sql();
        assert!(sql.contains("meal_title = $1"));
        assert!(sql.contains("meal_time = $2"));
        assert!(sql.contains("WHERE id = $3 AND user_id = $4"));
    }
}
