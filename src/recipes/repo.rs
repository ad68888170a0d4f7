use sqlx::{FromRow, PgExecutor, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiResult;

/// Recipe scalar row. The photo blob is fetched separately so list and
/// detail queries never haul image bytes.
#[derive(Debug, Clone, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub origin: String,
    pub difficulty: i32,
    pub preparation_time: String,
    pub cooking_time: String,
    pub serving_size: i32,
    pub source: String,
    pub has_photo: bool,
    pub created_at: OffsetDateTime,
}

const RECIPE_COLUMNS: &str = r#"
    id, user_id, name, origin, difficulty, preparation_time, cooking_time,
    serving_size, source, photo IS NOT NULL AS has_photo, created_at
"#;

/// Recipe names are unique across the system, so this lookup is unscoped.
pub async fn find_id_by_name<'e>(ex: impl PgExecutor<'e>, name: &str) -> ApiResult<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM recipes WHERE name = $1")
        .bind(name)
        .fetch_optional(ex)
        .await?;
    Ok(row.map(|(id,)| id))
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> ApiResult<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, Recipe>(&format!(
        r#"
        SELECT {RECIPE_COLUMNS}
          FROM recipes
         WHERE user_id = $1
         ORDER BY created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get(db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> ApiResult<Option<Recipe>> {
    let row = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2"
    ))
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Ordered step descriptions, ascending by step number.
pub async fn steps<'e>(ex: impl PgExecutor<'e>, recipe_id: Uuid) -> ApiResult<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT description
          FROM recipe_steps
         WHERE recipe_id = $1
         ORDER BY step_number ASC
        "#,
    )
    .bind(recipe_id)
    .fetch_all(ex)
    .await?;
    Ok(rows.into_iter().map(|(d,)| d).collect())
}

pub async fn ingredient_names<'e>(
    ex: impl PgExecutor<'e>,
    recipe_id: Uuid,
) -> ApiResult<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT i.name
          FROM ingredients i
          JOIN recipe_ingredients ri ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = $1
         ORDER BY i.name
        "#,
    )
    .bind(recipe_id)
    .fetch_all(ex)
    .await?;
    Ok(rows.into_iter().map(|(n,)| n).collect())
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    user_id: Uuid,
    name: &str,
    origin: &str,
    difficulty: i32,
    preparation_time: &str,
    cooking_time: &str,
    serving_size: i32,
    source: &str,
    photo: Option<&[u8]>,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO recipes (id, user_id, name, origin, difficulty, preparation_time,
                             cooking_time, serving_size, source, photo)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(recipe_id)
    .bind(user_id)
    .bind(name)
    .bind(origin)
    .bind(difficulty)
    .bind(preparation_time)
    .bind(cooking_time)
    .bind(serving_size)
    .bind(source)
    .bind(photo)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Replace the scalar fields. A NULL photo keeps the stored blob untouched.
#[allow(clippy::too_many_arguments)]
pub async fn update_scalars_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    user_id: Uuid,
    name: &str,
    origin: &str,
    difficulty: i32,
    preparation_time: &str,
    cooking_time: &str,
    serving_size: i32,
    source: &str,
    photo: Option<&[u8]>,
) -> ApiResult<u64> {
    let res = sqlx::query(
        r#"
        UPDATE recipes
           SET name = $1,
               origin = $2,
               difficulty = $3,
               preparation_time = $4,
               cooking_time = $5,
               serving_size = $6,
               source = $7,
               photo = coalesce($8, photo)
         WHERE id = $9 AND user_id = $10
        "#,
    )
    .bind(name)
    .bind(origin)
    .bind(difficulty)
    .bind(preparation_time)
    .bind(cooking_time)
    .bind(serving_size)
    .bind(source)
    .bind(photo)
    .bind(recipe_id)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(res.rows_affected())
}

/// Delete every step row, then reinsert the new list numbered 1..n in the
/// supplied order. Leaves no stale rows from a previously longer list.
pub async fn replace_steps_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    steps: &[String],
) -> ApiResult<()> {
    sqlx::query("DELETE FROM recipe_steps WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;
    for (step_number, description) in numbered(steps) {
        sqlx::query(
            r#"
            INSERT INTO recipe_steps (recipe_id, step_number, description)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(recipe_id)
        .bind(step_number)
        .bind(description)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn clear_ingredient_links_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
) -> ApiResult<()> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn link_ingredient_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    ingredient_id: Uuid,
    quantity: Option<&str>,
    unit: Option<&str>,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, quantity, unit)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(recipe_id)
    .bind(ingredient_id)
    .bind(quantity)
    .bind(unit)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn fetch_photo(
    db: &PgPool,
    user_id: Uuid,
    recipe_id: Uuid,
) -> ApiResult<Option<Option<Vec<u8>>>> {
    let row: Option<(Option<Vec<u8>>,)> =
        sqlx::query_as("SELECT photo FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(recipe_id)
            .bind(user_id)
            .fetch_optional(db)
            .await?;
    Ok(row.map(|(photo,)| photo))
}

pub async fn delete(db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> ApiResult<bool> {
    let res = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(recipe_id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// 1-based sequential numbering in input order.
fn numbered(steps: &[String]) -> impl Iterator<Item = (i32, &str)> {
    steps
        .iter()
        .enumerate()
        .map(|(i, s)| (i as i32 + 1, s.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_starts_at_one_with_no_gaps() {
        let steps = vec!["chop".to_string(), "fry".to_string(), "serve".to_string()];
        let numbered: Vec<_> = numbered(&steps).collect();
        assert_eq!(numbered, vec![(1, "chop"), (2, "fry"), (3, "serve")]);
    }

    #[test]
    fn numbering_preserves_supplied_order() {
        let steps = vec!["z".to_string(), "a".to_string()];
        let numbered: Vec<_> = numbered(&steps).collect();
        assert_eq!(numbered[0], (1, "z"));
        assert_eq!(numbered[1], (2, "a"));
    }
}
