//! Route wrapper that enforces the session guard on every navigation.

#[cfg(test)]
#[path = "navigation_guard_test.rs"]
mod navigation_guard_test;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use leptos_router::hooks::{use_location, use_navigate};

use crate::context::AppServices;
use crate::state::auth::AuthState;
use crate::util::auth::install_guard_redirect;

/// Path plus query string, as the guard expects it.
fn location_key(pathname: &str, search: &str) -> String {
    let search = search.trim_start_matches('?');
    if search.is_empty() { pathname.to_owned() } else { format!("{pathname}?{search}") }
}

/// Wrap the routes; redirects run whenever the location or session changes.
#[component]
pub fn NavigationGuard(children: Children) -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthState>>();
    let services = expect_context::<StoredValue<AppServices, LocalStorage>>();
    let location = use_location();
    let current = Signal::derive(move || location_key(&location.pathname.get(), &location.search.get()));

    install_guard_redirect(auth, services, current, use_navigate());

    view! {
        <Show when=move || auth.get().notice.is_some()>
            <p class="auth-notice">{move || auth.get().notice.unwrap_or_default()}</p>
        </Show>
        {children()}
    }
}
