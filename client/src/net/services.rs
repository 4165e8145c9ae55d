//! Typed calls to the course, video, user and AI services.
//!
//! Each call is a thin URL builder over `ApiClient`, so the bearer and
//! status rules live in one place.

#[cfg(test)]
#[path = "services_test.rs"]
mod services_test;

use super::api::ApiClient;
use super::transport::HttpRequest;
use super::types::{AiAnswer, AiQuestion, Course, CourseDraft, UserRecord, Video};
use crate::config::ServiceEndpoints;
use crate::error::ClientError;

fn courses_endpoint(base: &str) -> String {
    format!("{base}/api/courses")
}

fn course_endpoint(base: &str, id: i64) -> String {
    format!("{base}/api/courses/{id}")
}

fn course_search_endpoint(base: &str, keyword: &str) -> String {
    format!("{base}/api/courses/search?keyword={}", urlencoding::encode(keyword))
}

fn course_category_endpoint(base: &str, category: &str) -> String {
    format!("{base}/api/courses/category/{}", urlencoding::encode(category))
}

fn course_videos_endpoint(base: &str, course_id: i64) -> String {
    format!("{base}/api/videos?courseId={course_id}")
}

fn video_endpoint(base: &str, id: i64) -> String {
    format!("{base}/api/videos/{id}")
}

fn user_endpoint(base: &str, id: &str) -> String {
    format!("{base}/api/users/{}", urlencoding::encode(id))
}

fn ai_ask_endpoint(base: &str) -> String {
    format!("{base}/api/ai/ask")
}

fn ai_health_endpoint(base: &str) -> String {
    format!("{base}/api/ai/health")
}

/// Backend service facade.
#[derive(Clone)]
pub struct Backend {
    api: ApiClient,
    endpoints: ServiceEndpoints,
}

impl Backend {
    pub fn new(api: ApiClient, endpoints: ServiceEndpoints) -> Self {
        Self { api, endpoints }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// # Errors
    ///
    /// Any `ClientError` from the API client.
    pub async fn list_courses(&self) -> Result<Vec<Course>, ClientError> {
        self.api.get_json(&courses_endpoint(&self.endpoints.courses)).await
    }

    /// # Errors
    ///
    /// Any `ClientError` from the API client.
    pub async fn search_courses(&self, keyword: &str) -> Result<Vec<Course>, ClientError> {
        self.api.get_json(&course_search_endpoint(&self.endpoints.courses, keyword)).await
    }

    /// # Errors
    ///
    /// Any `ClientError` from the API client.
    pub async fn courses_by_category(&self, category: &str) -> Result<Vec<Course>, ClientError> {
        self.api.get_json(&course_category_endpoint(&self.endpoints.courses, category)).await
    }

    /// # Errors
    ///
    /// Any `ClientError` from the API client; `Status { status: 404, .. }` for
    /// an unknown id.
    pub async fn course(&self, id: i64) -> Result<Course, ClientError> {
        self.api.get_json(&course_endpoint(&self.endpoints.courses, id)).await
    }

    /// # Errors
    ///
    /// Any `ClientError` from the API client.
    pub async fn create_course(&self, draft: &CourseDraft) -> Result<Course, ClientError> {
        self.api.post_json(&courses_endpoint(&self.endpoints.courses), draft).await
    }

    /// # Errors
    ///
    /// Any `ClientError` from the API client.
    pub async fn update_course(&self, id: i64, draft: &CourseDraft) -> Result<Course, ClientError> {
        self.api.put_json(&course_endpoint(&self.endpoints.courses, id), draft).await
    }

    /// # Errors
    ///
    /// Any `ClientError` from the API client.
    pub async fn delete_course(&self, id: i64) -> Result<(), ClientError> {
        self.api.delete(&course_endpoint(&self.endpoints.courses, id)).await
    }

    /// # Errors
    ///
    /// Any `ClientError` from the API client.
    pub async fn course_videos(&self, course_id: i64) -> Result<Vec<Video>, ClientError> {
        self.api.get_json(&course_videos_endpoint(&self.endpoints.videos, course_id)).await
    }

    /// # Errors
    ///
    /// Any `ClientError` from the API client.
    pub async fn video(&self, id: i64) -> Result<Video, ClientError> {
        self.api.get_json(&video_endpoint(&self.endpoints.videos, id)).await
    }

    /// URL the video player streams from. The player fetches it directly.
    #[must_use]
    pub fn video_stream_url(&self, id: i64) -> String {
        format!("{}/stream", video_endpoint(&self.endpoints.videos, id))
    }

    /// # Errors
    ///
    /// Any `ClientError` from the API client.
    pub async fn user(&self, id: &str) -> Result<UserRecord, ClientError> {
        self.api.get_json(&user_endpoint(&self.endpoints.users, id)).await
    }

    /// Ask the assistant. The caller's profile id is filled in when known.
    ///
    /// # Errors
    ///
    /// Any `ClientError` from the API client, or `Status` when the assistant
    /// reports `success: false`.
    pub async fn ask(&self, question: AiQuestion) -> Result<AiAnswer, ClientError> {
        let mut question = question;
        if question.user_id.is_none() {
            question.user_id = self.api.session().session().user.map(|u| u.id);
        }
        let answer: AiAnswer = self.api.post_json(&ai_ask_endpoint(&self.endpoints.ai), &question).await?;
        if answer.success {
            Ok(answer)
        } else {
            Err(ClientError::Status {
                status: 200,
                message: answer
                    .error_message
                    .unwrap_or_else(|| "The assistant could not answer.".to_owned()),
            })
        }
    }

    /// Whether the assistant answers its health check. The reply is plain
    /// text; any failure counts as down.
    pub async fn ai_health(&self) -> bool {
        match self.api.send(HttpRequest::get(ai_health_endpoint(&self.endpoints.ai))).await {
            Ok(_) => true,
            Err(e) => {
                log::warn!("ai: health check failed: {e}");
                false
            }
        }
    }
}
