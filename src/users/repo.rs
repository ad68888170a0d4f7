use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiResult;

/// User record hydrated with its child collections.
///
/// `dietary_preferences` and `allergies` live in one-row-per-value child
/// tables and are folded back into ordered lists on every lookup.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub cooking_level: i32,
    pub photo_data: Option<Vec<u8>>,
    pub created_at: OffsetDateTime,
    pub dietary_preferences: Vec<String>,
    pub allergies: Vec<String>,
}

const USER_COLUMNS: &str = r#"
    u.id, u.user_name, u.name, u.email, u.password_hash, u.cooking_level,
    u.photo_data, u.created_at,
    coalesce(
        (SELECT array_agg(dp.preference ORDER BY dp.preference)
           FROM dietary_preferences dp WHERE dp.user_id = u.id),
        '{}'
    ) AS dietary_preferences,
    coalesce(
        (SELECT array_agg(a.allergen ORDER BY a.allergen)
           FROM allergies a WHERE a.user_id = u.id),
        '{}'
    ) AS allergies
"#;

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_user_name(db: &PgPool, user_name: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.user_name = $1"
        ))
        .bind(user_name)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, user_id: Uuid) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a user with default cooking level and empty child collections.
    pub async fn create(
        db: &PgPool,
        email: &str,
        user_name: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> ApiResult<User> {
        let id: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO users (email, user_name, name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(user_name)
        .bind(name)
        .bind(password_hash)
        .fetch_one(db)
        .await?;

        let user = Self::find_by_id(db, id.0).await?;
        user.ok_or(crate::error::ApiError::NotFound)
    }

    pub async fn delete_by_id(db: &PgPool, user_id: Uuid) -> ApiResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

/// Replace the scalar profile fields. A NULL photo keeps the stored one.
pub async fn update_scalars_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    email: &str,
    user_name: &str,
    name: Option<&str>,
    cooking_level: i32,
    photo_data: Option<&[u8]>,
) -> ApiResult<u64> {
    let res = sqlx::query(
        r#"
        UPDATE users
           SET email = $1,
               user_name = $2,
               name = $3,
               cooking_level = $4,
               photo_data = coalesce($5, photo_data)
         WHERE id = $6
        "#,
    )
    .bind(email)
    .bind(user_name)
    .bind(name)
    .bind(cooking_level)
    .bind(photo_data)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(res.rows_affected())
}

pub async fn replace_preferences_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    preferences: &[String],
) -> ApiResult<()> {
    sqlx::query("DELETE FROM dietary_preferences WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    for preference in preferences {
        sqlx::query(
            r#"
            INSERT INTO dietary_preferences (user_id, preference)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(preference)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn replace_allergies_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    allergies: &[String],
) -> ApiResult<()> {
    sqlx::query("DELETE FROM allergies WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    for allergen in allergies {
        sqlx::query(
            r#"
            INSERT INTO allergies (user_id, allergen)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(allergen)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
