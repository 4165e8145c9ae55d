//! Identity-provider backends.
//!
//! SYSTEM CONTEXT
//! ==============
//! The provider is the only authority on credentials. `OidcProvider` talks to
//! a Keycloak-style realm over the token and user-info endpoints;
//! `MockProvider` stands in for it in tests and in `mock` backend builds.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is mapped onto `ClientError` here so the session manager
//! never sees raw status codes.

#[cfg(test)]
#[path = "provider_test.rs"]
mod provider_test;

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;
use std::task::Poll;

use async_trait::async_trait;
use futures::future::poll_fn;
use serde_json::json;

use super::transport::{HttpRequest, HttpResponse, Transport};
use super::types::{ProviderErrorBody, TokenGrant, UserInfoClaims};
use crate::auth::jwt;
use crate::config::IdentityProviderConfig;
use crate::error::ClientError;
use crate::state::session::UserProfile;
use crate::util::clock::Clock;

#[async_trait(?Send)]
pub trait IdentityProvider {
    /// Resource-owner password grant.
    async fn password_grant(&self, username: &str, password: &str) -> Result<TokenGrant, ClientError>;

    /// Exchange a refresh token for a new grant.
    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, ClientError>;

    /// Profile claims for the bearer of `access_token`.
    async fn user_info(&self, access_token: &str) -> Result<UserProfile, ClientError>;
}

/// Which grant a token-endpoint response belongs to; 400/401 mean different things.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GrantKind {
    Password,
    Refresh,
}

/// OIDC provider reached through a `Transport`.
#[derive(Clone)]
pub struct OidcProvider {
    config: IdentityProviderConfig,
    transport: Rc<dyn Transport>,
}

impl OidcProvider {
    pub fn new(config: IdentityProviderConfig, transport: Rc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    async fn token_request(&self, fields: &[(&str, &str)], kind: GrantKind) -> Result<TokenGrant, ClientError> {
        let request = HttpRequest::post(self.config.token_endpoint())
            .header("Accept", "application/json")
            .form_body(fields);
        let resp = self
            .transport
            .send(request)
            .await
            .map_err(|e| ClientError::NetworkUnavailable(e.0))?;
        token_grant_from_response(&resp, kind)
    }
}

#[async_trait(?Send)]
impl IdentityProvider for OidcProvider {
    async fn password_grant(&self, username: &str, password: &str) -> Result<TokenGrant, ClientError> {
        let fields = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("username", username),
            ("password", password),
            ("scope", self.config.scope.as_str()),
        ];
        self.token_request(&fields, GrantKind::Password).await
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, ClientError> {
        let fields = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        self.token_request(&fields, GrantKind::Refresh).await
    }

    async fn user_info(&self, access_token: &str) -> Result<UserProfile, ClientError> {
        let request = HttpRequest::get(self.config.userinfo_endpoint())
            .header("Accept", "application/json")
            .bearer(access_token);
        let resp = self
            .transport
            .send(request)
            .await
            .map_err(|e| ClientError::NetworkUnavailable(e.0))?;
        match resp.status {
            401 => return Err(ClientError::SessionExpired),
            403 => return Err(ClientError::Forbidden),
            _ if !resp.is_success() => {
                return Err(ClientError::Status { status: resp.status, message: user_info_failed_message(resp.status) });
            }
            _ => {}
        }
        serde_json::from_str::<UserInfoClaims>(&resp.body)
            .map(UserInfoClaims::into_profile)
            .map_err(|e| ClientError::MalformedServerResponse(format!("user-info: {e}")))
    }
}

fn user_info_failed_message(status: u16) -> String {
    format!("user-info request failed: {status}")
}

fn token_grant_from_response(resp: &HttpResponse, kind: GrantKind) -> Result<TokenGrant, ClientError> {
    if resp.is_success() {
        let grant: TokenGrant = serde_json::from_str(&resp.body)
            .map_err(|e| ClientError::MalformedServerResponse(format!("token response: {e}")))?;
        if grant.access_token.trim().is_empty() {
            return Err(ClientError::MalformedServerResponse("token response: empty access_token".to_owned()));
        }
        return Ok(grant);
    }

    let detail = serde_json::from_str::<ProviderErrorBody>(&resp.body)
        .ok()
        .and_then(|body| body.description());
    match (resp.status, kind) {
        (400 | 401, GrantKind::Password) => Err(ClientError::CredentialsInvalid(detail.unwrap_or_default())),
        (400 | 401, GrantKind::Refresh) => Err(ClientError::SessionExpired),
        (status, _) => Err(ClientError::Status {
            status,
            message: detail.unwrap_or_else(|| format!("token request failed: {status}")),
        }),
    }
}

/// Default lifetime of tokens minted by `MockProvider`.
pub const MOCK_TOKEN_TTL_SECS: i64 = 3600;

/// A live mock token and the other half of its grant.
#[derive(Clone, Debug)]
struct IssuedToken {
    profile: UserProfile,
    pair: String,
}

#[derive(Clone, Debug)]
struct MockAccount {
    password: String,
    profile: UserProfile,
}

/// In-process identity provider.
///
/// With no registered accounts every credential pair is accepted and the
/// user gets the `user` role. Tokens are unsigned JWTs whose `exp` is
/// `now + ttl`, so the session guard treats them like real ones.
#[derive(Clone)]
pub struct MockProvider {
    clock: Rc<dyn Clock>,
    accounts: Rc<RefCell<HashMap<String, MockAccount>>>,
    issued: Rc<RefCell<HashMap<String, IssuedToken>>>,
    scripted_failures: Rc<RefCell<VecDeque<ClientError>>>,
    ttl_secs: Rc<Cell<i64>>,
    latency_polls: Rc<Cell<u32>>,
    serial: Rc<Cell<u64>>,
    password_calls: Rc<Cell<u32>>,
    refresh_calls: Rc<Cell<u32>>,
    user_info_calls: Rc<Cell<u32>>,
}

impl MockProvider {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            accounts: Rc::default(),
            issued: Rc::default(),
            scripted_failures: Rc::default(),
            ttl_secs: Rc::new(Cell::new(MOCK_TOKEN_TTL_SECS)),
            latency_polls: Rc::new(Cell::new(0)),
            serial: Rc::new(Cell::new(0)),
            password_calls: Rc::new(Cell::new(0)),
            refresh_calls: Rc::new(Cell::new(0)),
            user_info_calls: Rc::new(Cell::new(0)),
        }
    }

    /// Register an account; once any exist, unknown credentials are rejected.
    pub fn add_account(&self, username: &str, password: &str, roles: &[&str]) {
        let profile = UserProfile {
            id: format!("mock-{username}"),
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            first_name: "Mock".to_owned(),
            last_name: "User".to_owned(),
            roles: roles.iter().map(|r| (*r).to_owned()).collect(),
        };
        self.accounts
            .borrow_mut()
            .insert(username.to_owned(), MockAccount { password: password.to_owned(), profile });
    }

    pub fn set_token_ttl(&self, secs: i64) {
        self.ttl_secs.set(secs);
    }

    /// Suspend each call for `polls` executor polls before answering.
    pub fn set_latency(&self, polls: u32) {
        self.latency_polls.set(polls);
    }

    /// Fail the next call (of any kind) with `error`.
    pub fn fail_next(&self, error: ClientError) {
        self.scripted_failures.borrow_mut().push_back(error);
    }

    #[must_use]
    pub fn password_calls(&self) -> u32 {
        self.password_calls.get()
    }

    #[must_use]
    pub fn refresh_calls(&self) -> u32 {
        self.refresh_calls.get()
    }

    #[must_use]
    pub fn user_info_calls(&self) -> u32 {
        self.user_info_calls.get()
    }

    /// Access and refresh tokens the provider still honors.
    #[must_use]
    pub fn live_tokens(&self) -> usize {
        self.issued.borrow().len()
    }

    async fn simulate(&self) -> Result<(), ClientError> {
        yield_polls(self.latency_polls.get()).await;
        match self.scripted_failures.borrow_mut().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn mint(&self, profile: &UserProfile) -> TokenGrant {
        let serial = self.serial.get() + 1;
        self.serial.set(serial);
        let now = self.clock.now();
        let ttl = self.ttl_secs.get();
        let roles: Vec<&String> = profile.roles.iter().collect();
        let access_token = jwt::encode_unsigned(&json!({
            "sub": profile.id,
            "preferred_username": profile.username,
            "email": profile.email,
            "iat": now,
            "exp": now + ttl,
            "jti": serial,
            "realm_access": { "roles": roles },
        }));
        let refresh_token = format!("mock-refresh-{}-{serial}", profile.username);
        let mut issued = self.issued.borrow_mut();
        issued.insert(
            access_token.clone(),
            IssuedToken { profile: profile.clone(), pair: refresh_token.clone() },
        );
        issued.insert(
            refresh_token.clone(),
            IssuedToken { profile: profile.clone(), pair: access_token.clone() },
        );
        TokenGrant {
            access_token,
            refresh_token: Some(refresh_token),
            expires_in: Some(ttl),
            token_type: Some("Bearer".to_owned()),
        }
    }

    fn profile_for(&self, username: &str, password: &str) -> Result<UserProfile, ClientError> {
        let accounts = self.accounts.borrow();
        if accounts.is_empty() {
            return Ok(UserProfile {
                id: format!("mock-{username}"),
                username: username.to_owned(),
                email: format!("{username}@example.com"),
                first_name: "Mock".to_owned(),
                last_name: "User".to_owned(),
                roles: BTreeSet::from(["user".to_owned()]),
            });
        }
        match accounts.get(username) {
            Some(account) if account.password == password => Ok(account.profile.clone()),
            _ => Err(ClientError::CredentialsInvalid("Invalid user credentials".to_owned())),
        }
    }
}

#[async_trait(?Send)]
impl IdentityProvider for MockProvider {
    async fn password_grant(&self, username: &str, password: &str) -> Result<TokenGrant, ClientError> {
        self.password_calls.set(self.password_calls.get() + 1);
        self.simulate().await?;
        let profile = self.profile_for(username, password)?;
        Ok(self.mint(&profile))
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, ClientError> {
        self.refresh_calls.set(self.refresh_calls.get() + 1);
        self.simulate().await?;
        // Refresh tokens rotate: the used one and its access token are retired.
        let used = {
            let mut issued = self.issued.borrow_mut();
            let used = issued.remove(refresh_token);
            if let Some(used) = &used {
                issued.remove(&used.pair);
            }
            used
        };
        match used {
            Some(used) => Ok(self.mint(&used.profile)),
            None => Err(ClientError::SessionExpired),
        }
    }

    async fn user_info(&self, access_token: &str) -> Result<UserProfile, ClientError> {
        self.user_info_calls.set(self.user_info_calls.get() + 1);
        self.simulate().await?;
        if jwt::is_expired(access_token, self.clock.now()) {
            return Err(ClientError::SessionExpired);
        }
        self.issued
            .borrow()
            .get(access_token)
            .map(|issued| issued.profile.clone())
            .ok_or(ClientError::SessionExpired)
    }
}

/// Stay pending for `remaining` polls, waking the task each time.
async fn yield_polls(mut remaining: u32) {
    poll_fn(move |cx| {
        if remaining == 0 {
            return Poll::Ready(());
        }
        remaining -= 1;
        cx.waker().wake_by_ref();
        Poll::Pending
    })
    .await;
}
