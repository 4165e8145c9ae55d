//! Profile page: the cached identity-provider profile with a reload action.

#[cfg(test)]
#[path = "profile_test.rs"]
mod profile_test;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;

use crate::context::AppServices;
use crate::state::auth::AuthState;
use crate::state::session::UserProfile;

fn or_not_provided(value: &str) -> String {
    if value.trim().is_empty() { "Not provided".to_owned() } else { value.to_owned() }
}

fn profile_rows(profile: &UserProfile) -> Vec<(&'static str, String)> {
    let roles = profile.roles.iter().cloned().collect::<Vec<_>>().join(", ");
    vec![
        ("Name", profile.display_name()),
        ("Username", or_not_provided(&profile.username)),
        ("Email", or_not_provided(&profile.email)),
        ("Roles", if roles.is_empty() { "None".to_owned() } else { roles }),
    ]
}

#[component]
pub fn ProfilePage() -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthState>>();
    let services = expect_context::<StoredValue<AppServices, LocalStorage>>();
    let reloading = RwSignal::new(false);
    let error = RwSignal::new(None::<String>);

    let on_reload = move |_| {
        if reloading.get() {
            return;
        }
        reloading.set(true);
        error.set(None);

        #[cfg(feature = "csr")]
        {
            let session = services.with_value(|s| s.session.clone());
            leptos::task::spawn_local(async move {
                if let Err(e) = session.reload_profile().await {
                    let message = e.user_message();
                    if !message.is_empty() {
                        error.set(Some(message));
                    }
                }
                reloading.set(false);
            });
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = services;
            reloading.set(false);
        }
    };

    view! {
        <div class="profile-page">
            <h1>"Your profile"</h1>
            {move || match auth.get().user().cloned() {
                Some(profile) => view! {
                    <dl class="profile-rows">
                        {profile_rows(&profile)
                            .into_iter()
                            .map(|(label, value)| view! { <dt>{label}</dt><dd>{value}</dd> })
                            .collect_view()}
                    </dl>
                }
                .into_any(),
                None => view! { <p class="profile-empty">"Profile not loaded yet."</p> }.into_any(),
            }}
            <button class="btn" on:click=on_reload disabled=move || reloading.get()>
                {move || if reloading.get() { "Reloading..." } else { "Reload profile" }}
            </button>
            <Show when=move || error.get().is_some()>
                <p class="profile-error">{move || error.get().unwrap_or_default()}</p>
            </Show>
        </div>
    }
}
