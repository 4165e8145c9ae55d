//! Login page: username/password against the configured identity provider.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use leptos_router::hooks::{use_navigate, use_query_map};
#[cfg(feature = "csr")]
use leptos_router::NavigateOptions;

use crate::context::AppServices;
use crate::error::ClientError;
use crate::state::auth::AuthState;

fn validate_login_input(username: &str, password: &str) -> Result<(String, String), &'static str> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err("Enter both username and password.");
    }
    Ok((username.to_owned(), password.to_owned()))
}

/// Inline message for a failed login; superseded attempts show nothing.
fn login_error_message(err: &ClientError) -> Option<String> {
    match err {
        ClientError::Cancelled => None,
        other => Some(other.user_message()),
    }
}

#[component]
pub fn LoginPage() -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthState>>();
    let services = expect_context::<StoredValue<AppServices, LocalStorage>>();
    let query = use_query_map();
    let navigate = use_navigate();

    let username = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let error = RwSignal::new(None::<String>);
    let busy = move || auth.get().phase.is_loading();

    // Leaving the page drops a login that is still in flight.
    on_cleanup(move || {
        if auth.get_untracked().phase.is_loading() {
            services.with_value(|s| s.session.abandon());
        }
    });

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if busy() {
            return;
        }
        let (user, pass) = match validate_login_input(&username.get(), &password.get()) {
            Ok(input) => input,
            Err(msg) => {
                error.set(Some(msg.to_owned()));
                return;
            }
        };
        error.set(None);
        let target = services.with_value(|s| s.guard.return_target(query.get_untracked().get("from").as_deref()));

        #[cfg(feature = "csr")]
        {
            let session = services.with_value(|s| s.session.clone());
            let navigate = navigate.clone();
            leptos::task::spawn_local(async move {
                match session.login(&user, &pass).await {
                    Ok(_) => {
                        password.set(String::new());
                        navigate(&target, NavigateOptions::default());
                    }
                    Err(e) => error.set(login_error_message(&e)),
                }
            });
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = (user, pass, target, &navigate);
        }
    };

    view! {
        <div class="login-page">
            <div class="login-card">
                <h1>"CourseHub"</h1>
                <p class="login-card__subtitle">"Sign in to continue learning"</p>
                <form class="login-form" on:submit=on_submit>
                    <input
                        class="login-input"
                        type="text"
                        placeholder="Username"
                        autocomplete="username"
                        prop:value=move || username.get()
                        on:input=move |ev| username.set(event_target_value(&ev))
                    />
                    <input
                        class="login-input"
                        type="password"
                        placeholder="Password"
                        autocomplete="current-password"
                        prop:value=move || password.get()
                        on:input=move |ev| password.set(event_target_value(&ev))
                    />
                    <button class="login-button" type="submit" disabled=busy>
                        {move || if busy() { "Signing in..." } else { "Sign In" }}
                    </button>
                </form>
                <Show when=move || error.get().is_some()>
                    <p class="login-message login-message--error">{move || error.get().unwrap_or_default()}</p>
                </Show>
                <a href="/courses" class="login-link">"Browse the catalog without signing in"</a>
            </div>
        </div>
    }
}
