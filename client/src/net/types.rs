//! Wire DTOs for the identity provider and backend services.
//!
//! DESIGN
//! ======
//! Provider payloads use the OIDC snake_case names; backend DTOs follow the
//! services' camelCase JSON. Optional fields default so older service builds
//! that omit them still decode.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::state::session::UserProfile;

/// Successful token-endpoint response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// OAuth error body (`invalid_grant`, `invalid_client`, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ProviderErrorBody {
    /// Best human-readable description, if the body carried one.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.error_description
            .clone()
            .or_else(|| self.error.clone())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UserInfoRealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// OIDC user-info response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UserInfoClaims {
    pub sub: String,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub realm_access: Option<UserInfoRealmAccess>,
}

impl UserInfoClaims {
    #[must_use]
    pub fn into_profile(self) -> UserProfile {
        let roles: BTreeSet<String> = self.realm_access.map(|a| a.roles.into_iter().collect()).unwrap_or_default();
        UserProfile {
            id: self.sub,
            username: self.preferred_username.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            first_name: self.given_name.unwrap_or_default(),
            last_name: self.family_name.unwrap_or_default(),
            roles,
        }
    }
}

/// Lesson video attached to a course.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Course catalog entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    /// Decimal price as sent by the service.
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub instructor_id: Option<i64>,
    #[serde(default)]
    pub instructor_name: Option<String>,
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub enrollment_count: Option<u32>,
}

/// Create/update payload for a course.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// User record from the users service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub enrolled_courses: Option<u32>,
    #[serde(default)]
    pub completed_courses: Option<u32>,
}

/// Question for the AI assistant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiQuestion {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// AI assistant reply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnswer {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub source_references: Option<String>,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

fn default_true() -> bool {
    true
}
