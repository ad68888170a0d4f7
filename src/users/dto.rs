use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::User;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub user_name: String,
    pub name: Option<String>,
    pub email: String,
    pub cooking_level: i32,
    pub dietary_preferences: Vec<String>,
    pub allergies: Vec<String>,
    pub has_photo: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for ProfileResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            user_name: u.user_name,
            name: u.name,
            email: u.email,
            cooking_level: u.cooking_level,
            dietary_preferences: u.dietary_preferences,
            allergies: u.allergies,
            has_photo: u.photo_data.is_some(),
            created_at: u.created_at,
        }
    }
}

/// Profile edit. Omitted fields keep their stored values; an omitted photo
/// never erases the stored one.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cooking_level: Option<i32>,
    #[serde(default)]
    pub dietary_preferences: Option<Vec<String>>,
    #[serde(default)]
    pub allergies: Option<Vec<String>>,
    #[serde(default)]
    pub photo: Option<serde_bytes::ByteBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_response_hides_password_hash() {
        let response = ProfileResponse {
            id: Uuid::new_v4(),
            user_name: "cook".into(),
            name: None,
            email: "cook@example.com".into(),
            cooking_level: 3,
            dietary_preferences: vec!["vegetarian".into()],
            allergies: vec![],
            has_photo: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("vegetarian"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn update_request_fields_default_to_absent() {
        let req: UpdateProfileRequest = serde_json::from_str("{}").unwrap();
        assert!(req.email.is_none());
        assert!(req.photo.is_none());
        assert!(req.dietary_preferences.is_none());
    }

    #[test]
    fn update_request_photo_decodes_from_byte_array() {
        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"photo": [1, 2, 3]}"#).unwrap();
        assert_eq!(req.photo.unwrap().as_ref(), &[1u8, 2, 3]);
    }
}
