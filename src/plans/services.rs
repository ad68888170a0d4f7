use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::diff::diff_links;
use crate::error::{ApiError, ApiResult};
use crate::plans::repo::{self, PlanChanges};

lazy_static! {
    static ref DATE_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    static ref DATETIME_RE: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}(:\d{2})?$").unwrap();
}

pub(crate) fn is_valid_date(s: &str) -> bool {
    DATE_RE.is_match(s)
}

pub(crate) fn is_valid_datetime(s: &str) -> bool {
    DATETIME_RE.is_match(s)
}

/// ISO dates compare lexicographically; no parsing needed or wanted.
pub(crate) fn validate_date_range(start: &str, end: &str) -> ApiResult<()> {
    if !is_valid_date(start) || !is_valid_date(end) {
        return Err(ApiError::Validation(
            "Dates must be in YYYY-MM-DD format".into(),
        ));
    }
    if start > end {
        return Err(ApiError::Validation(
            "Start date must not be after end date".into(),
        ));
    }
    Ok(())
}

fn validate_schedule(schedule: &BTreeMap<Uuid, String>) -> ApiResult<()> {
    for scheduled_at in schedule.values() {
        if !is_valid_datetime(scheduled_at) {
            return Err(ApiError::Validation(
                "Schedule timestamps must be in YYYY-MM-DD HH:MM[:SS] format".into(),
            ));
        }
    }
    Ok(())
}

async fn check_meal_ownership(db: &PgPool, user_id: Uuid, ids: &[Uuid]) -> ApiResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let owned = repo::count_owned_meals(db, user_id, ids).await?;
    if owned != ids.len() as i64 {
        return Err(ApiError::Validation("Unknown meal id".into()));
    }
    Ok(())
}

/// Insert the plan and one schedule link per meal in one transaction; a
/// half-created plan is worse than no plan, so any failure rolls back all
/// of it.
pub async fn create_plan(
    db: &PgPool,
    user_id: Uuid,
    title: &str,
    start_date: &str,
    end_date: &str,
    goals: &str,
    schedule: BTreeMap<Uuid, String>,
) -> ApiResult<Uuid> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Plan title is required".into()));
    }
    validate_date_range(start_date, end_date)?;
    validate_schedule(&schedule)?;
    let meal_ids: Vec<Uuid> = schedule.keys().copied().collect();
    check_meal_ownership(db, user_id, &meal_ids).await?;

    let plan_id = Uuid::new_v4();
    let mut tx = db.begin().await?;
    repo::insert_tx(&mut tx, plan_id, user_id, title, start_date, end_date, goals).await?;
    for (meal_id, scheduled_at) in &schedule {
        repo::link_meal_tx(&mut tx, plan_id, *meal_id, scheduled_at).await?;
    }
    tx.commit().await?;

    info!(user_id = %user_id, plan_id = %plan_id, meals = schedule.len(), "meal plan created");
    Ok(plan_id)
}

/// Partial scalar update plus three-way schedule reconciliation: meals only
/// in the stored map are unlinked, meals only in the new map are linked, and
/// meals in both get their timestamp patched only when it changed.
pub async fn update_plan(
    db: &PgPool,
    user_id: Uuid,
    plan_id: Uuid,
    changes: PlanChanges,
    schedule: Option<BTreeMap<Uuid, String>>,
) -> ApiResult<()> {
    // The stored row fills in whichever date bound the update omits, so the
    // range invariant is checked against what will actually be persisted.
    let current = repo::get(db, user_id, plan_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let effective_start = changes.start_date.as_deref().unwrap_or(&current.start_date);
    let effective_end = changes.end_date.as_deref().unwrap_or(&current.end_date);
    validate_date_range(effective_start, effective_end)?;
    if let Some(schedule) = &schedule {
        validate_schedule(schedule)?;
    }

    let mut tx = db.begin().await?;

    if let Some(0) = repo::update_scalars_tx(&mut tx, plan_id, user_id, &changes).await? {
        return Err(ApiError::NotFound);
    }

    if let Some(desired) = schedule {
        let stored = repo::schedule(&mut *tx, plan_id).await?;
        let diff = diff_links(&stored, &desired);

        if !diff.added.is_empty() {
            let added: Vec<Uuid> = diff.added.iter().map(|(id, _)| *id).collect();
            let owned = repo::count_owned_meals(&mut *tx, user_id, &added).await?;
            if owned != added.len() as i64 {
                return Err(ApiError::Validation("Unknown meal id".into()));
            }
        }
        for meal_id in diff.removed {
            repo::unlink_meal_tx(&mut tx, plan_id, meal_id).await?;
        }
        for (meal_id, scheduled_at) in diff.added {
            repo::link_meal_tx(&mut tx, plan_id, meal_id, &scheduled_at).await?;
        }
        for (meal_id, scheduled_at) in diff.patched {
            repo::reschedule_meal_tx(&mut tx, plan_id, meal_id, &scheduled_at).await?;
        }
    }

    tx.commit().await?;
    info!(user_id = %user_id, plan_id = %plan_id, "meal plan updated");
    Ok(())
}

/// Delete link rows, then the plan row, in that order, in one transaction.
pub async fn delete_plan(db: &PgPool, user_id: Uuid, plan_id: Uuid) -> ApiResult<()> {
    let mut tx = db.begin().await?;
    let deleted = repo::delete_tx(&mut tx, plan_id, user_id).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    tx.commit().await?;
    info!(user_id = %user_id, plan_id = %plan_id, "meal plan deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_range_passes() {
        assert!(validate_date_range("2025-06-01", "2025-06-10").is_ok());
        assert!(validate_date_range("2025-06-01", "2025-06-01").is_ok());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = validate_date_range("2025-06-10", "2025-06-01").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(validate_date_range("06/01/2025", "2025-06-10").is_err());
        assert!(validate_date_range("2025-06-01", "soon").is_err());
        assert!(validate_date_range("2025-6-1", "2025-06-10").is_err());
    }

    #[test]
    fn lexicographic_comparison_spans_year_boundaries() {
        assert!(validate_date_range("2024-12-31", "2025-01-01").is_ok());
        assert!(validate_date_range("2025-01-01", "2024-12-31").is_err());
    }

    #[test]
    fn datetime_accepts_space_and_t_separators() {
        assert!(is_valid_datetime("2025-06-01 08:30:00"));
        assert!(is_valid_datetime("2025-06-01T08:30"));
        assert!(!is_valid_datetime("2025-06-01"));
        assert!(!is_valid_datetime("tomorrow at eight"));
    }

    #[test]
    fn schedule_with_bad_timestamp_is_rejected() {
        let mut schedule = BTreeMap::new();
        schedule.insert(Uuid::new_v4(), "whenever".to_string());
        assert!(validate_schedule(&schedule).is_err());
    }
}
