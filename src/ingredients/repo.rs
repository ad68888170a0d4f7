use sqlx::{PgExecutor, Postgres, Transaction};
use uuid::Uuid;

use crate::error::ApiResult;

/// First ingredient of this user whose name contains `name_query`,
/// case-insensitively. Used as an existence check before creating a new
/// ingredient, so only the first match matters.
pub async fn find_first_match<'e>(
    ex: impl PgExecutor<'e>,
    user_id: Uuid,
    name_query: &str,
) -> ApiResult<Option<Uuid>> {
    let pattern = format!("%{}%", name_query.trim());
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id
          FROM ingredients
         WHERE user_id = $1
           AND name ILIKE $2
         ORDER BY name
         LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(pattern)
    .fetch_optional(ex)
    .await?;
    Ok(row.map(|(id,)| id))
}

pub async fn create<'e>(
    ex: impl PgExecutor<'e>,
    user_id: Uuid,
    name: &str,
    store: Option<&str>,
    unit: Option<&str>,
    seasonal_availability: Option<&str>,
) -> ApiResult<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO ingredients (id, user_id, name, store, unit, seasonal_availability)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(name)
    .bind(store)
    .bind(unit)
    .bind(seasonal_availability)
    .execute(ex)
    .await?;
    Ok(id)
}

/// Find-or-create resolution used by recipe create and edit.
///
/// Idempotent per (user_id, name): resolving the same name twice reuses the
/// first row instead of inserting a duplicate.
pub async fn resolve_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    name: &str,
) -> ApiResult<Uuid> {
    if let Some(id) = find_first_match(&mut **tx, user_id, name).await? {
        return Ok(id);
    }
    create(&mut **tx, user_id, name, None, None, None).await
}
