use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::recipes::repo::Recipe;
use crate::recipes::services::RecipeInput;

fn default_difficulty() -> i32 {
    1
}
fn default_serving_size() -> i32 {
    1
}
fn default_source() -> String {
    "self".into()
}

#[derive(Debug, Deserialize)]
pub struct RecipeRequest {
    pub name: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: i32,
    #[serde(default)]
    pub preparation_time: String,
    #[serde(default)]
    pub cooking_time: String,
    #[serde(default = "default_serving_size")]
    pub serving_size: i32,
    #[serde(default = "default_source")]
    pub source: String,
    pub steps: Vec<String>,
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub photo: Option<serde_bytes::ByteBuf>,
}

impl From<RecipeRequest> for RecipeInput {
    fn from(r: RecipeRequest) -> Self {
        Self {
            name: r.name,
            origin: r.origin,
            difficulty: r.difficulty,
            preparation_time: r.preparation_time,
            cooking_time: r.cooking_time,
            serving_size: r.serving_size,
            source: r.source,
            steps: r.steps,
            ingredients: r.ingredients,
            photo: r.photo.map(|b| b.into_vec()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub origin: String,
    pub difficulty: i32,
    pub serving_size: i32,
    pub source: String,
    pub has_photo: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Recipe> for RecipeSummary {
    fn from(r: Recipe) -> Self {
        Self {
            id: r.id,
            name: r.name,
            origin: r.origin,
            difficulty: r.difficulty,
            serving_size: r.serving_size,
            source: r.source,
            has_photo: r.has_photo,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeDetails {
    pub id: Uuid,
    pub name: String,
    pub origin: String,
    pub difficulty: i32,
    pub preparation_time: String,
    pub cooking_time: String,
    pub serving_size: i32,
    pub source: String,
    pub has_photo: bool,
    pub steps: Vec<String>,
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
    fn request_defaults_apply() {
        let req: RecipeRequest = serde_json::from_str(
            r#"{"name": "Toast", "steps": ["toast bread"], "ingredients": ["bread"]}"#,
        )
        .unwrap();
        assert_eq!(req.difficulty, 1);
        assert_eq!(req.serving_size, 1);
        assert_eq!(req.source, "self");
        assert!(req.photo.is_none());
    }

    #[test]
    fn missing_steps_fail_to_parse() {
        let res: Result<RecipeRequest, _> =
            serde_json::from_str(r#"{"name": "Toast", "ingredients": ["bread"]}"#);
        assert!(res.is_err());
    }
}
