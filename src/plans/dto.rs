use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::plans::repo::MealPlan;

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub goals: String,
    /// meal id → "YYYY-MM-DD HH:MM[:SS]"
    #[serde(default)]
    pub schedule: BTreeMap<Uuid, String>,
}

/// Partial update: omitted fields are left untouched. A supplied `schedule`
/// is reconciled against the stored one, not blindly rewritten.
#[derive(Debug, Deserialize)]
pub struct UpdatePlanRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub goals: Option<String>,
    #[serde(default)]
    pub schedule: Option<BTreeMap<Uuid, String>>,
}

#[derive(Debug, Serialize)]
pub struct PlanSummary {
    pub id: Uuid,
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub goals: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<MealPlan> for PlanSummary {
    fn from(p: MealPlan) -> Self {
        Self {
            id: p.id,
            title: p.title,
            start_date: p.start_date,
            end_date: p.end_date,
            goals: p.goals,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScheduledMeal {
    pub meal_id: Uuid,
    pub meal_title: String,
    pub scheduled_at: String,
}

#[derive(Debug, Serialize)]
pub struct PlanDetails {
    pub id: Uuid,
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub goals: String,
    pub meals: Vec<ScheduledMeal>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_map_parses_uuid_keys() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"title": "Week 23", "start_date": "2025-06-02", "end_date": "2025-06-08", "schedule": {{"{id}": "2025-06-02 08:00:00"}}}}"#);
        let req: CreatePlanRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req.schedule.get(&id).map(String::as_str), Some("2025-06-02 08:00:00"));
        assert_eq!(req.goals, "");
    }

    #[test]
    fn update_request_all_fields_optional() {
        let req: UpdatePlanRequest = serde_json::from_str("{}").unwrap();
        assert!(req.title.is_none());
        assert!(req.schedule.is_none());
    }
}
