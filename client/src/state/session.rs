//! Session and user-profile model plus the session phase machine.
//!
//! DESIGN
//! ======
//! `Session` is plain data owned by the session manager. The profile is a
//! read-only cache of what the identity provider reported; role decisions
//! fall back to the token's own claims when no profile has been fetched.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::auth::jwt;
use crate::net::types::TokenGrant;

/// Profile claims for the signed-in user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl UserProfile {
    /// "First Last" when known, otherwise the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() { self.username.clone() } else { full.to_owned() }
    }

    #[must_use]
    pub fn has_any_role(&self, required: &BTreeSet<String>) -> bool {
        !self.roles.is_disjoint(required)
    }
}

/// Tokens and cached profile for the current browser session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Unix seconds derived from the grant's `expires_in`.
    pub expires_at: Option<i64>,
    pub user: Option<UserProfile>,
}

impl Session {
    /// Build a session from a fresh token grant issued at `now`.
    #[must_use]
    pub fn from_grant(grant: &TokenGrant, now: i64) -> Self {
        Self {
            access_token: Some(grant.access_token.clone()),
            refresh_token: grant.refresh_token.clone().filter(|t| !t.is_empty()),
            expires_at: grant
                .expires_in
                .map(|secs| now.saturating_add(secs))
                .or_else(|| jwt::expires_at(&grant.access_token)),
            user: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }

    /// Expiry of the access token: the grant's `expires_in`, else the JWT `exp`.
    #[must_use]
    pub fn effective_expiry(&self) -> Option<i64> {
        let token = self.access_token.as_deref()?;
        self.expires_at.or_else(|| jwt::expires_at(token))
    }

    /// The access token, only while its expiry lies in the future.
    /// A token with no known expiry is never valid.
    #[must_use]
    pub fn valid_access_token(&self, now: i64) -> Option<&str> {
        let exp = self.effective_expiry()?;
        self.access_token.as_deref().filter(|_| now < exp)
    }

    #[must_use]
    pub fn is_authenticated(&self, now: i64) -> bool {
        self.valid_access_token(now).is_some()
    }

    /// True when the access token is missing, invalid, or expires within `leeway` seconds.
    #[must_use]
    pub fn expires_within(&self, now: i64, leeway: i64) -> bool {
        match self.effective_expiry() {
            Some(exp) => now.saturating_add(leeway) >= exp,
            None => true,
        }
    }

    /// Roles from the cached profile, or from the token claims without one.
    #[must_use]
    pub fn roles(&self) -> BTreeSet<String> {
        if let Some(user) = &self.user {
            return user.roles.clone();
        }
        self.access_token
            .as_deref()
            .and_then(jwt::decode_claims)
            .map(|claims| claims.roles())
            .unwrap_or_default()
    }
}

/// Lifecycle of the one session owned by the application shell.
///
/// `Anonymous -> Authenticating -> Authenticated -> (Expired | LoggedOut) -> Anonymous`.
/// `Expired` and `LoggedOut` are transient: the manager settles on
/// `Anonymous` immediately after clearing storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
    Expired,
    LoggedOut,
}

impl SessionPhase {
    /// Whether the phase machine allows moving from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use SessionPhase::{Anonymous, Authenticated, Authenticating, Expired, LoggedOut};
        matches!(
            (self, next),
            (Anonymous | Authenticating, Authenticating)
                | (Authenticating, Authenticated | Anonymous)
                | (Authenticated, Authenticated | Expired | LoggedOut)
                | (Expired | LoggedOut, Anonymous)
        )
    }

    #[must_use]
    pub fn is_loading(self) -> bool {
        self == Self::Authenticating
    }
}
