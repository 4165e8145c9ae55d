//! Durable storage for the session's tokens and cached profile.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session manager is the only caller. Pages and components never read
//! storage themselves; they observe the manager instead.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here returns an error. Unreadable or malformed stored data loads
//! as an empty session, and failed writes are logged and dropped.

#[cfg(test)]
#[path = "token_store_test.rs"]
mod token_store_test;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::session::{Session, UserProfile};

pub const TOKEN_KEY: &str = "auth_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const EXPIRES_AT_KEY: &str = "expires_at";
pub const USER_KEY: &str = "user";
pub const AUTHENTICATED_KEY: &str = "isAuthenticated";

/// Keys written by earlier front-end builds; removed on `clear()`.
const LEGACY_KEYS: [&str; 2] = ["token", "refreshToken"];

/// Minimal string key-value store with interior mutability.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.items.borrow_mut().insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

/// `window.localStorage`, scoped to the page origin.
#[cfg(feature = "csr")]
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStorage;

#[cfg(feature = "csr")]
impl BrowserStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window().and_then(|w| w.local_storage().ok().flatten())
    }
}

#[cfg(feature = "csr")]
impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        let Some(storage) = Self::storage() else {
            log::warn!("localStorage unavailable; dropping write of {key}");
            return;
        };
        if storage.set_item(key, value).is_err() {
            log::warn!("localStorage rejected write of {key}");
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// Persists `Session` fields under fixed keys of a `KeyValueStore`.
#[derive(Clone)]
pub struct TokenStore {
    storage: Rc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(storage: Rc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Write every session field; absent fields are removed.
    pub fn save(&self, session: &Session) {
        self.put(TOKEN_KEY, session.access_token.as_deref());
        self.put(REFRESH_TOKEN_KEY, session.refresh_token.as_deref());
        self.put(EXPIRES_AT_KEY, session.expires_at.map(|t| t.to_string()).as_deref());

        let user = session.user.as_ref().and_then(|user| match serde_json::to_string(user) {
            Ok(raw) => Some(raw),
            Err(e) => {
                log::warn!("failed to serialize user profile: {e}");
                None
            }
        });
        self.put(USER_KEY, user.as_deref());

        if session.access_token.is_some() {
            self.storage.set(AUTHENTICATED_KEY, "true");
        } else {
            self.storage.remove(AUTHENTICATED_KEY);
        }
    }

    /// The last saved session, or an empty one if nothing usable is stored.
    pub fn load(&self) -> Session {
        match self.try_load() {
            Some(session) => session,
            None => Session::default(),
        }
    }

    /// Remove every session key, including legacy ones.
    pub fn clear(&self) {
        for key in [TOKEN_KEY, REFRESH_TOKEN_KEY, EXPIRES_AT_KEY, USER_KEY, AUTHENTICATED_KEY]
            .into_iter()
            .chain(LEGACY_KEYS)
        {
            self.storage.remove(key);
        }
    }

    fn try_load(&self) -> Option<Session> {
        let access_token = self.non_empty(TOKEN_KEY);
        let refresh_token = self.non_empty(REFRESH_TOKEN_KEY);
        if access_token.is_none() && refresh_token.is_none() {
            return None;
        }

        let expires_at = match self.non_empty(EXPIRES_AT_KEY) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(t) => Some(t),
                Err(_) => {
                    log::debug!("stored expiry is malformed; treating session as empty");
                    return None;
                }
            },
            None => None,
        };

        let user = match self.non_empty(USER_KEY) {
            Some(raw) => match serde_json::from_str::<UserProfile>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    log::debug!("stored user profile is malformed ({e}); treating session as empty");
                    return None;
                }
            },
            None => None,
        };

        Some(Session { access_token, refresh_token, expires_at, user })
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.storage.get(key).filter(|v| !v.trim().is_empty())
    }

    fn put(&self, key: &str, value: Option<&str>) {
        match value {
            Some(v) => self.storage.set(key, v),
            None => self.storage.remove(key),
        }
    }
}
