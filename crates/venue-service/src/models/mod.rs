//! Data models for the venue service.

use chrono::{DateTime, Utc};
use common::secret::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of venues per search page.
pub const DEFAULT_PAGE_SIZE: usize = 15;

/// Upper bound on a requested page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// A registered account. Credentials live with the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    /// The provider's user id (the `sub` of its ID tokens).
    pub provider_uid: String,
    pub email: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Request body for `POST /api/v1/users`.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub password: SecretString,
}

/// Response body for a created user.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            created_on: user.created_on,
            updated_on: user.updated_on,
            email: user.email,
        }
    }
}

/// A place to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Venue {
    pub id: Uuid,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
    pub name: String,
    pub address: String,
    pub website: String,
    pub city_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_place_id: Option<String>,
    pub sport_type: String,
    pub thumbnail_url: String,
    pub description: String,
    pub note: String,
}

/// Venue fields supplied by a user, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewVenue {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub website: String,
    pub city_id: String,
    #[serde(default)]
    pub google_place_id: Option<String>,
    pub sport_type: String,
    pub thumbnail_url: String,
    pub description: String,
    #[serde(default)]
    pub note: String,
}

/// A page request over venues in one city for one sport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueSearch {
    pub city_id: String,
    pub sport: String,
    /// Id of the last venue on the previous page.
    pub cursor: Option<Uuid>,
    pub page_size: usize,
}

/// One page of search results.
#[derive(Debug, Clone, Serialize)]
pub struct VenuePage {
    pub results: Vec<Venue>,
    /// Cursor for the next page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Body of the `/ready` probe.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_keys: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_hides_password() {
        let req: RegisterUserRequest =
            serde_json::from_str(r#"{"email":"a@example.com","password":"hunter22"}"#).unwrap();
        assert!(!format!("{req:?}").contains("hunter22"));
    }

    #[test]
    fn test_new_venue_optional_fields_default() {
        let venue: NewVenue = serde_json::from_str(
            r#"{"name":"Court","city_id":"ChIJ","sport_type":"tennis",
                "thumbnail_url":"https://img.example.com/a.png","description":"d"}"#,
        )
        .unwrap();
        assert!(venue.google_place_id.is_none());
        assert!(venue.note.is_empty());
        assert!(venue.address.is_empty());
    }

    #[test]
    fn test_user_response_from_user() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            provider_uid: "uid".to_string(),
            email: "a@example.com".to_string(),
            created_on: now,
            updated_on: now,
        };
        let id = user.id.to_string();
        let response = UserResponse::from(user);
        assert_eq!(response.id, id);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("provider_uid").is_none());
    }

    #[test]
    fn test_readiness_response_omits_empty_fields() {
        let ready = ReadinessResponse {
            status: "ready",
            signing_keys: Some("available"),
            error: None,
        };
        let json = serde_json::to_string(&ready).unwrap();
        assert!(json.contains("\"status\":\"ready\""));
        assert!(!json.contains("\"error\""));
    }
}
