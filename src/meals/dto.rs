use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::meals::repo::Meal;

#[derive(Debug, Deserialize)]
pub struct CreateMealRequest {
    pub meal_title: String,
    #[serde(default)]
    pub meal_time: String,
    pub recipe_ids: Vec<Uuid>,
}

/// Partial update: omitted fields are left untouched, not cleared.
#[derive(Debug, Deserialize)]
pub struct UpdateMealRequest {
    #[serde(default)]
    pub meal_title: Option<String>,
    #[serde(default)]
    pub meal_time: Option<String>,
    #[serde(default)]
    pub recipe_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
pub struct MealSummary {
    pub id: Uuid,
    pub meal_title: String,
    pub meal_time: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Meal> for MealSummary {
    fn from(m: Meal) -> Self {
        Self {
            id: m.id,
            meal_title: m.meal_title,
            meal_time: m.meal_time,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MealRecipeSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct MealDetails {
    pub id: Uuid,
    pub meal_title: String,
    pub meal_time: String,
    pub recipes: Vec<MealRecipeSummary>,
    /// Union of ingredient names across all linked recipes, deduplicated.
    pub ingredients: Vec<String>,
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
    fn update_request_with_only_meal_time_leaves_rest_absent() {
        let req: UpdateMealRequest = serde_json::from_str(r#"{"meal_time": "Dinner"}"#).unwrap();
        assert_eq!(req.meal_time.as_deref(), Some("Dinner"));
        assert!(req.meal_title.is_none());
        assert!(req.recipe_ids.is_none());
    }
}
