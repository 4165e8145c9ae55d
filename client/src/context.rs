//! Application service wiring.
//!
//! DESIGN
//! ======
//! `AppServices` is built once by the application shell and handed to
//! components through context. It is the only place that decides which
//! identity provider backs the session, and nothing else holds the storage
//! handle.

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;

use std::rc::Rc;

use crate::auth::guard::{AccessDecision, SessionGuard};
use crate::auth::manager::SessionManager;
use crate::config::{AuthBackend, ClientConfig};
use crate::net::api::ApiClient;
use crate::net::provider::{IdentityProvider, MockProvider, OidcProvider};
use crate::net::services::Backend;
use crate::net::transport::Transport;
use crate::state::token_store::{KeyValueStore, TokenStore};
use crate::util::clock::Clock;

#[derive(Clone)]
pub struct AppServices {
    pub config: ClientConfig,
    pub session: SessionManager,
    pub api: ApiClient,
    pub backend: Backend,
    pub guard: SessionGuard,
}

impl AppServices {
    pub fn build(
        config: ClientConfig,
        storage: Rc<dyn KeyValueStore>,
        transport: Rc<dyn Transport>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let provider: Rc<dyn IdentityProvider> = match config.backend {
            AuthBackend::Oidc => Rc::new(OidcProvider::new(config.idp.clone(), Rc::clone(&transport))),
            AuthBackend::Mock => {
                log::info!("auth: using the in-process mock identity provider");
                Rc::new(MockProvider::new(Rc::clone(&clock)))
            }
        };
        let session = SessionManager::new(provider, TokenStore::new(storage), clock);
        session.set_refresh_leeway(config.refresh_leeway_secs);
        let api = ApiClient::new(transport, session.clone());
        let backend = Backend::new(api.clone(), config.services.clone());
        Self { config, session, api, backend, guard: SessionGuard::coursehub() }
    }

    /// Guard decision for `path` against the current session.
    #[must_use]
    pub fn authorize(&self, path: &str) -> AccessDecision {
        self.guard.authorize(path, &self.session.session(), self.session.now())
    }
}
