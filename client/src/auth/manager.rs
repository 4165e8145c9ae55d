//! Session lifecycle: login, restore, refresh, logout and invalidation.
//!
//! SYSTEM CONTEXT
//! ==============
//! `SessionManager` owns the one `Session` of the tab together with the token
//! store and the identity provider. The API client asks it for bearer tokens
//! and reports 401s back; the UI subscribes to `SessionChange` notifications
//! and re-runs the route guard on each one.
//!
//! CONCURRENCY
//! ===========
//! Everything runs cooperatively on one thread. Two rules keep concurrent
//! futures honest:
//!
//! - Every login/refresh/profile request is tagged with the epoch current when
//!   it started. `logout`, `abandon`, `invalidate` and a newer `login` bump the
//!   epoch, and a response that comes back under an older epoch is dropped
//!   with `ClientError::Cancelled` instead of being applied.
//! - Refresh is single-flight. The first caller creates a `Shared` future and
//!   parks it in a slot; later callers in the same epoch await a clone of it.
//!
//! ERROR HANDLING
//! ==============
//! Failures never persist partial tokens. `SessionExpired` from the provider
//! clears the session; network and payload errors leave it intact.

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::config::DEFAULT_REFRESH_LEEWAY_SECS;
use crate::error::ClientError;
use crate::net::provider::IdentityProvider;
use crate::net::types::TokenGrant;
use crate::state::session::{Session, SessionPhase, UserProfile};
use crate::state::token_store::TokenStore;
use crate::util::clock::Clock;

/// What happened to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Restored,
    LoginStarted,
    LoggedIn,
    LoginFailed,
    Refreshed,
    ProfileLoaded,
    LoggedOut,
    Expired,
    Abandoned,
}

/// Snapshot handed to listeners after every state change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionChange {
    pub event: SessionEvent,
    pub phase: SessionPhase,
    pub session: Session,
}

pub type ListenerId = u64;

type Listener = Rc<dyn Fn(&SessionChange)>;
type RefreshFuture = Shared<LocalBoxFuture<'static, Result<String, ClientError>>>;

struct Inner {
    provider: Rc<dyn IdentityProvider>,
    store: TokenStore,
    clock: Rc<dyn Clock>,
    session: RefCell<Session>,
    phase: Cell<SessionPhase>,
    epoch: Cell<u64>,
    refresh: RefCell<Option<(u64, RefreshFuture)>>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_listener: Cell<ListenerId>,
    leeway_secs: Cell<i64>,
}

/// Handle to the tab's session. Clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Rc<Inner>,
}

impl SessionManager {
    pub fn new(provider: Rc<dyn IdentityProvider>, store: TokenStore, clock: Rc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(Inner {
                provider,
                store,
                clock,
                session: RefCell::default(),
                phase: Cell::new(SessionPhase::Anonymous),
                epoch: Cell::new(0),
                refresh: RefCell::new(None),
                listeners: RefCell::default(),
                next_listener: Cell::new(1),
                leeway_secs: Cell::new(DEFAULT_REFRESH_LEEWAY_SECS),
            }),
        }
    }

    /// Refresh proactively once the token expires within `secs` seconds.
    pub fn set_refresh_leeway(&self, secs: i64) {
        self.inner.leeway_secs.set(secs.max(0));
    }

    #[must_use]
    pub fn refresh_leeway(&self) -> i64 {
        self.inner.leeway_secs.get()
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.session.borrow().clone()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.inner.phase.get()
    }

    #[must_use]
    pub fn now(&self) -> i64 {
        self.inner.clock.now()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.session.borrow().is_authenticated(self.now())
    }

    /// The current access token if it has not expired. Never refreshes.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        let now = self.now();
        self.inner.session.borrow().valid_access_token(now).map(str::to_owned)
    }

    /// Call `listener` after every session change until unsubscribed.
    pub fn subscribe(&self, listener: impl Fn(&SessionChange) + 'static) -> ListenerId {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.inner.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }

    // =============================================================
    // Lifecycle
    // =============================================================

    /// Adopt the persisted session, if any, at application start.
    ///
    /// A stored token that is still valid is taken as is. An expired one is
    /// renewed through the refresh token when there is one; a provider
    /// rejection clears storage, while a network failure keeps storage for
    /// the next start and leaves this tab anonymous.
    pub async fn restore(&self) -> SessionPhase {
        if self.phase() != SessionPhase::Anonymous {
            return self.phase();
        }
        let stored = self.inner.store.load();
        if stored.is_empty() {
            return self.phase();
        }

        self.bump_epoch();
        self.set_phase(SessionPhase::Authenticating);
        let needs_refresh = stored.expires_within(self.now(), self.refresh_leeway());
        let has_refresh_token = stored.refresh_token.is_some();
        let still_valid = stored.is_authenticated(self.now());
        *self.inner.session.borrow_mut() = stored;

        if !needs_refresh || (still_valid && !has_refresh_token) {
            self.set_phase(SessionPhase::Authenticated);
            log::info!("session: restored stored session");
            self.notify(SessionEvent::Restored);
            return self.phase();
        }
        if !has_refresh_token {
            log::info!("session: stored token expired and cannot be renewed");
            self.invalidate();
            return self.phase();
        }

        match self.refresh().await {
            Ok(_) => {
                log::info!("session: restored stored session through refresh");
                self.notify(SessionEvent::Restored);
            }
            Err(ClientError::Cancelled | ClientError::SessionExpired) => {}
            Err(e) => {
                log::warn!("session: could not renew stored session: {e}");
                if self.phase() == SessionPhase::Authenticating && self.is_authenticated() {
                    self.set_phase(SessionPhase::Authenticated);
                    self.notify(SessionEvent::Restored);
                } else if self.phase() == SessionPhase::Authenticating {
                    *self.inner.session.borrow_mut() = Session::default();
                    self.set_phase(SessionPhase::Anonymous);
                    self.notify(SessionEvent::Abandoned);
                }
            }
        }
        self.phase()
    }

    /// Exchange credentials for a session.
    ///
    /// Any existing session is signed out first. A login superseded by a
    /// newer login, `abandon()` or `logout()` resolves to `Cancelled` and
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// `CredentialsInvalid`, `NetworkUnavailable`, `MalformedServerResponse`
    /// or `Status` from the provider; `Cancelled` when superseded.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        if self.phase() == SessionPhase::Authenticated {
            self.end_session(SessionPhase::LoggedOut, SessionEvent::LoggedOut);
        }
        let epoch = self.bump_epoch();
        self.set_phase(SessionPhase::Authenticating);
        self.notify(SessionEvent::LoginStarted);

        let provider = Rc::clone(&self.inner.provider);
        let granted = provider.password_grant(username, password).await;
        if self.is_stale(epoch) {
            log::debug!("session: discarding stale login response");
            return Err(ClientError::Cancelled);
        }
        let grant = match granted {
            Ok(grant) => grant,
            Err(e) => return Err(self.fail_login(e)),
        };

        let mut session = match self.session_from_grant(&grant) {
            Ok(session) => session,
            Err(e) => return Err(self.fail_login(e)),
        };
        let profile = provider.user_info(&grant.access_token).await;
        if self.is_stale(epoch) {
            log::debug!("session: discarding stale login response");
            return Err(ClientError::Cancelled);
        }
        match profile {
            Ok(profile) => session.user = Some(profile),
            Err(e) => log::warn!("session: profile fetch after login failed: {e}"),
        }

        self.inner.store.save(&session);
        *self.inner.session.borrow_mut() = session.clone();
        self.set_phase(SessionPhase::Authenticated);
        log::info!("session: signed in as {username}");
        self.notify(SessionEvent::LoggedIn);
        Ok(session)
    }

    /// Sign out and clear storage. Pending requests are discarded.
    pub fn logout(&self) {
        self.bump_epoch();
        self.end_session(SessionPhase::LoggedOut, SessionEvent::LoggedOut);
        log::info!("session: signed out");
    }

    /// The server no longer accepts the session (401 or rejected refresh).
    pub fn invalidate(&self) {
        self.bump_epoch();
        self.end_session(SessionPhase::Expired, SessionEvent::Expired);
        log::info!("session: invalidated");
    }

    /// Drop whatever login or refresh is in flight without touching the
    /// current session, e.g. when the user navigates away from the form.
    pub fn abandon(&self) {
        self.bump_epoch();
        if self.phase() == SessionPhase::Authenticating {
            *self.inner.session.borrow_mut() = Session::default();
            self.set_phase(SessionPhase::Anonymous);
            self.notify(SessionEvent::Abandoned);
        }
    }

    // =============================================================
    // Tokens
    // =============================================================

    /// Renew the access token through the refresh token.
    ///
    /// Concurrent callers share one provider call and all receive its result.
    ///
    /// # Errors
    ///
    /// `SessionExpired` when there is no refresh token or the provider
    /// rejects it (the session is cleared); `Cancelled` when the session
    /// changed while the call was in flight; network and payload errors
    /// otherwise, with the session left intact.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        let pending = self.refresh_future();
        pending.await
    }

    /// A bearer token for an outgoing request.
    ///
    /// Refreshes first when the token expires within the leeway. A token
    /// that is still valid is used if that refresh fails for reasons other
    /// than expiry. `Ok(None)` means there is nothing to attach.
    ///
    /// # Errors
    ///
    /// `SessionExpired` when renewal was rejected, `Cancelled` when the
    /// session changed underneath, network errors when the token already
    /// expired and could not be renewed.
    pub async fn fresh_access_token(&self) -> Result<Option<String>, ClientError> {
        let now = self.now();
        let (current, needs_refresh, can_refresh) = {
            let session = self.inner.session.borrow();
            (
                session.valid_access_token(now).map(str::to_owned),
                session.expires_within(now, self.refresh_leeway()),
                session.refresh_token.is_some(),
            )
        };

        if !needs_refresh {
            return Ok(current);
        }
        if !can_refresh {
            if current.is_none() && self.phase() == SessionPhase::Authenticated {
                log::info!("session: access token expired");
                self.invalidate();
            }
            return Ok(current);
        }

        match self.refresh().await {
            Ok(token) => Ok(Some(token)),
            Err(e @ (ClientError::SessionExpired | ClientError::Cancelled)) => Err(e),
            Err(e) => match self.access_token() {
                Some(token) => {
                    log::warn!("session: refresh failed, using current token: {e}");
                    Ok(Some(token))
                }
                None => Err(e),
            },
        }
    }

    /// Fetch the profile again and cache it in the session.
    ///
    /// # Errors
    ///
    /// `SessionExpired` without a valid token or when the provider answers
    /// 401 (the session is cleared); `Cancelled` when the session changed
    /// while waiting; provider errors otherwise.
    pub async fn reload_profile(&self) -> Result<UserProfile, ClientError> {
        let Some(token) = self.fresh_access_token().await? else {
            return Err(ClientError::SessionExpired);
        };
        let epoch = self.inner.epoch.get();
        let provider = Rc::clone(&self.inner.provider);
        let fetched = provider.user_info(&token).await;
        if self.is_stale(epoch) {
            return Err(ClientError::Cancelled);
        }
        match fetched {
            Ok(profile) => {
                let snapshot = {
                    let mut session = self.inner.session.borrow_mut();
                    session.user = Some(profile.clone());
                    session.clone()
                };
                self.inner.store.save(&snapshot);
                self.notify(SessionEvent::ProfileLoaded);
                Ok(profile)
            }
            Err(ClientError::SessionExpired) => {
                self.invalidate();
                Err(ClientError::SessionExpired)
            }
            Err(e) => Err(e),
        }
    }

    // =============================================================
    // Internals
    // =============================================================

    fn refresh_future(&self) -> RefreshFuture {
        let epoch = self.inner.epoch.get();
        if let Some((slot_epoch, pending)) = self.inner.refresh.borrow().as_ref() {
            if *slot_epoch == epoch {
                return pending.clone();
            }
        }

        let Some(refresh_token) = self.inner.session.borrow().refresh_token.clone() else {
            return futures::future::ready(Err(ClientError::SessionExpired)).boxed_local().shared();
        };
        let weak = Rc::downgrade(&self.inner);
        let pending = run_refresh(weak, epoch, refresh_token).boxed_local().shared();
        *self.inner.refresh.borrow_mut() = Some((epoch, pending.clone()));
        pending
    }

    fn finish_refresh(&self, epoch: u64, granted: Result<TokenGrant, ClientError>) -> Result<String, ClientError> {
        if self.is_stale(epoch) {
            log::debug!("session: discarding stale refresh response");
            return Err(ClientError::Cancelled);
        }
        self.inner.refresh.borrow_mut().take();

        let grant = match granted {
            Ok(grant) => grant,
            Err(ClientError::SessionExpired) => {
                log::info!("session: refresh token rejected");
                self.invalidate();
                return Err(ClientError::SessionExpired);
            }
            Err(e) => {
                log::warn!("session: refresh failed: {e}");
                return Err(e);
            }
        };

        let mut next = self.session_from_grant(&grant)?;
        let token = grant.access_token;
        {
            let current = self.inner.session.borrow();
            if next.refresh_token.is_none() {
                next.refresh_token.clone_from(&current.refresh_token);
            }
            next.user.clone_from(&current.user);
        }
        self.inner.store.save(&next);
        *self.inner.session.borrow_mut() = next;
        self.set_phase(SessionPhase::Authenticated);
        log::debug!("session: access token refreshed");
        self.notify(SessionEvent::Refreshed);
        Ok(token)
    }

    /// Session for `grant`, rejecting tokens the guard could never accept.
    fn session_from_grant(&self, grant: &TokenGrant) -> Result<Session, ClientError> {
        let now = self.now();
        let session = Session::from_grant(grant, now);
        if session.is_authenticated(now) {
            Ok(session)
        } else {
            Err(ClientError::MalformedServerResponse(
                "access token has no usable expiry".to_owned(),
            ))
        }
    }

    fn fail_login(&self, error: ClientError) -> ClientError {
        log::info!("session: login failed: {error}");
        *self.inner.session.borrow_mut() = Session::default();
        self.set_phase(SessionPhase::Anonymous);
        self.notify(SessionEvent::LoginFailed);
        error
    }

    /// Clear memory and storage, passing through `via` when authenticated.
    fn end_session(&self, via: SessionPhase, event: SessionEvent) {
        self.inner.refresh.borrow_mut().take();
        self.inner.store.clear();
        *self.inner.session.borrow_mut() = Session::default();
        if self.phase() == SessionPhase::Authenticated {
            self.set_phase(via);
            self.notify(event);
            self.set_phase(SessionPhase::Anonymous);
        } else {
            self.set_phase(SessionPhase::Anonymous);
            self.notify(event);
        }
    }

    fn bump_epoch(&self) -> u64 {
        let next = self.inner.epoch.get() + 1;
        self.inner.epoch.set(next);
        next
    }

    fn is_stale(&self, epoch: u64) -> bool {
        self.inner.epoch.get() != epoch
    }

    fn set_phase(&self, next: SessionPhase) {
        let current = self.inner.phase.get();
        if current != next && !current.can_transition_to(next) {
            log::warn!("session: unexpected phase change {current:?} -> {next:?}");
        }
        self.inner.phase.set(next);
    }

    fn notify(&self, event: SessionEvent) {
        let change = SessionChange { event, phase: self.phase(), session: self.session() };
        let listeners: Vec<Listener> = self.inner.listeners.borrow().iter().map(|(_, l)| Rc::clone(l)).collect();
        for listener in listeners {
            listener(&change);
        }
    }
}

/// Body of the shared refresh future. Holds only a weak handle so a parked
/// future never keeps the manager alive.
async fn run_refresh(inner: Weak<Inner>, epoch: u64, refresh_token: String) -> Result<String, ClientError> {
    let provider = match inner.upgrade() {
        Some(inner) => Rc::clone(&inner.provider),
        None => return Err(ClientError::Cancelled),
    };
    let granted = provider.refresh_grant(&refresh_token).await;
    let Some(inner) = inner.upgrade() else {
        return Err(ClientError::Cancelled);
    };
    SessionManager { inner }.finish_refresh(epoch, granted)
}
