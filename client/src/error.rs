//! Typed error taxonomy for session and backend calls.
//!
//! ERROR HANDLING
//! ==============
//! Storage and guard paths never produce these; they fail soft to an
//! anonymous session. Everything that talks to the network returns a
//! `ClientError` so callers can decide between inline messages, redirects
//! and retries without inspecting transport details.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Failure surfaced by the session manager, identity provider and API client.
///
/// `Clone` so a single refresh outcome can be handed to every waiter.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The identity provider rejected the submitted credentials.
    #[error("invalid credentials: {0}")]
    CredentialsInvalid(String),

    /// The access token expired or a backend answered 401.
    #[error("session expired")]
    SessionExpired,

    /// The user is authenticated but not permitted to do this.
    #[error("forbidden")]
    Forbidden,

    /// No response from the provider or backend.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// A response arrived but its payload had an unexpected shape.
    #[error("malformed server response: {0}")]
    MalformedServerResponse(String),

    /// The request was abandoned or superseded before its response arrived.
    #[error("request cancelled")]
    Cancelled,

    /// A backend failed for a reason unrelated to authentication.
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
}

impl ClientError {
    /// Whether this failure destroys the local session.
    #[must_use]
    pub fn clears_session(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkUnavailable(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Short text suitable for showing inline next to a form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::CredentialsInvalid(detail) if detail.is_empty() => "Invalid username or password.".to_owned(),
            Self::CredentialsInvalid(detail) => detail.clone(),
            Self::SessionExpired => "Your session has expired. Please sign in again.".to_owned(),
            Self::Forbidden => "You do not have permission to access this resource.".to_owned(),
            Self::NetworkUnavailable(_) => "No response from server. Please check your connection.".to_owned(),
            Self::MalformedServerResponse(_) => "The server sent an unexpected response.".to_owned(),
            Self::Cancelled => String::new(),
            Self::Status { status, .. } if *status == 404 => "Resource not found.".to_owned(),
            Self::Status { status, .. } if *status >= 500 => {
                "Server error occurred. Please try again later.".to_owned()
            }
            Self::Status { message, .. } => message.clone(),
        }
    }
}
