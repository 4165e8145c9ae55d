//! Dashboard: the authenticated landing page.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use leptos_router::NavigateOptions;
use leptos_router::hooks::use_navigate;

use super::area::RoleArea;
use crate::context::AppServices;
use crate::state::auth::AuthState;
use crate::state::session::Session;

fn greeting(session: &Session) -> String {
    match &session.user {
        Some(user) => format!("Welcome back, {}!", user.display_name()),
        None => "Welcome back!".to_owned(),
    }
}

fn role_badges(session: &Session) -> Vec<String> {
    session.roles().into_iter().collect()
}

/// Links shown for the user's roles, most privileged first.
fn role_links(session: &Session) -> Vec<(&'static str, &'static str)> {
    RoleArea::ALL
        .into_iter()
        .filter(|area| area.is_open_to(session))
        .map(|area| (area.path(), area.title()))
        .collect()
}

#[component]
pub fn DashboardPage() -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthState>>();
    let services = expect_context::<StoredValue<AppServices, LocalStorage>>();
    let navigate = use_navigate();

    let on_logout = move |_| {
        services.with_value(|s| s.session.logout());
        navigate("/login", NavigateOptions::default());
    };

    view! {
        <div class="dashboard-page">
            <header class="dashboard-header">
                <h1>{move || greeting(&auth.get().session)}</h1>
                <button class="btn" on:click=on_logout>"Sign Out"</button>
            </header>
            <ul class="role-list">
                <For each=move || role_badges(&auth.get().session) key=|role| role.clone() let:role>
                    <li class="role-badge">{role}</li>
                </For>
            </ul>
            <nav class="dashboard-links">
                <a href="/courses">"Browse courses"</a>
                <a href="/profile">"Your profile"</a>
                <For each=move || role_links(&auth.get().session) key=|(href, _)| *href let:link>
                    <a href=link.0>{link.1}</a>
                </For>
            </nav>
        </div>
    }
}
