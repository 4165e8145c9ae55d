//! Shared auth navigation helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every route applies identical redirect behavior, so the decision lives
//! here and `NavigationGuard` is its only caller in the view tree.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use leptos_router::NavigateOptions;

use crate::auth::guard::SessionGuard;
use crate::context::AppServices;
use crate::state::auth::AuthState;

/// Where navigation should go for `location` (path plus query), if anywhere.
///
/// Nothing happens while the session is loading. A signed-in user on the
/// login page is sent to its `from` target; everyone else gets the guard's
/// decision.
pub fn guard_redirect(guard: &SessionGuard, location: &str, state: &AuthState, now: i64) -> Option<String> {
    if state.loading() {
        return None;
    }
    let (path, query) = location.split_once('?').unwrap_or((location, ""));
    if guard.bounce_target(path, &state.session, now).is_some() {
        let from = if path.trim_end_matches('/') == guard.login_path() { query_param(query, "from") } else { None };
        return Some(guard.return_target(from));
    }
    guard.authorize(location, &state.session, now).redirect_to
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find_map(|(key, value)| (key == name).then_some(value))
}

/// Re-run the guard whenever the session or the location changes.
pub fn install_guard_redirect<F>(
    auth: RwSignal<AuthState>,
    services: StoredValue<AppServices, LocalStorage>,
    location: Signal<String>,
    navigate: F,
) where
    F: Fn(&str, NavigateOptions) + Clone + 'static,
{
    Effect::new(move || {
        let state = auth.get();
        let current = location.get();
        let target = services.with_value(|s| guard_redirect(&s.guard, &current, &state, s.session.now()));
        if let Some(target) = target.filter(|t| *t != current) {
            navigate(&target, NavigateOptions { replace: true, ..NavigateOptions::default() });
        }
    });
}
