use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::users::repo;

pub struct ProfileUpdate {
    pub email: String,
    pub user_name: String,
    pub name: Option<String>,
    pub cooking_level: i32,
    pub dietary_preferences: Vec<String>,
    pub allergies: Vec<String>,
    pub photo_data: Option<Vec<u8>>,
}

/// Replace the profile row and both child collections in one transaction.
///
/// The child collections are fully rewritten (delete-all-then-reinsert);
/// either everything commits or the profile is left exactly as it was.
pub async fn update_profile(db: &PgPool, user_id: Uuid, update: ProfileUpdate) -> ApiResult<()> {
    let mut tx = db.begin().await?;

    let affected = repo::update_scalars_tx(
        &mut tx,
        user_id,
        &update.email,
        &update.user_name,
        update.name.as_deref(),
        update.cooking_level,
        update.photo_data.as_deref(),
    )
    .await?;
    if affected == 0 {
        return Err(ApiError::NotFound);
    }

    repo::replace_preferences_tx(&mut tx, user_id, &update.dietary_preferences).await?;
    repo::replace_allergies_tx(&mut tx, user_id, &update.allergies).await?;

    tx.commit().await?;
    info!(user_id = %user_id, "profile updated");
    Ok(())
}

/// Trim entries and drop empties; the child tables never store blank values.
pub fn normalize_list(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_drops_empties() {
        let raw = vec![
            "  gluten free ".to_string(),
            "".to_string(),
            "   ".to_string(),
            "nuts".to_string(),
        ];
        assert_eq!(normalize_list(&raw), vec!["gluten free", "nuts"]);
    }

    #[test]
    fn normalize_keeps_order() {
        let raw = vec!["b".to_string(), "a".to_string()];
        assert_eq!(normalize_list(&raw), vec!["b", "a"]);
    }
}
