//! Auth-session state for the current browser user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Provided as `RwSignal<AuthState>` context by the app shell and kept in
//! sync from `SessionManager` notifications. Route guards and user-aware
//! components read it; only the manager writes the underlying session.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::auth::manager::{SessionChange, SessionEvent};
use crate::state::session::{Session, SessionPhase, UserProfile};

/// Reactive snapshot of the session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub phase: SessionPhase,
    pub session: Session,
    /// Set once the stored session has been restored (or found absent).
    pub restored: bool,
    /// Notice for the user about the last auth change, if any.
    pub notice: Option<String>,
}

impl AuthState {
    /// True until startup restore finishes and while a login is in flight.
    #[must_use]
    pub fn loading(&self) -> bool {
        !self.restored || self.phase.is_loading()
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.session.user.as_ref()
    }

    pub fn apply(&mut self, change: &SessionChange) {
        self.phase = change.phase;
        self.session = change.session.clone();
        self.notice = match change.event {
            SessionEvent::Expired => Some("Your session has expired. Please sign in again.".to_owned()),
            SessionEvent::LoggedOut => Some("You have been signed out.".to_owned()),
            SessionEvent::LoginStarted | SessionEvent::LoggedIn | SessionEvent::Restored => None,
            _ => self.notice.take(),
        };
        if matches!(change.event, SessionEvent::Restored | SessionEvent::LoggedIn) {
            self.restored = true;
        }
    }
}
