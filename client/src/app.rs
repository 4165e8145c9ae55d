//! Root application component with routing and context providers.

use std::rc::Rc;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use leptos_meta::{Title, provide_meta_context};
use leptos_router::{
    StaticSegment,
    components::{Route, Router, Routes},
};

use crate::components::navigation_guard::NavigationGuard;
use crate::config::ClientConfig;
use crate::context::AppServices;
use crate::net::transport::Transport;
use crate::pages::area::{RoleArea, RoleAreaPage};
use crate::pages::{courses::CoursesPage, dashboard::DashboardPage, login::LoginPage, profile::ProfilePage};
use crate::state::auth::AuthState;
use crate::state::token_store::KeyValueStore;
use crate::util::clock::SystemClock;

/// Browser storage and `fetch` under `csr`; in-memory and offline otherwise.
fn platform() -> (Rc<dyn KeyValueStore>, Rc<dyn Transport>) {
    #[cfg(feature = "csr")]
    {
        use crate::net::transport::BrowserTransport;
        use crate::state::token_store::BrowserStorage;
        (Rc::new(BrowserStorage), Rc::new(BrowserTransport))
    }
    #[cfg(not(feature = "csr"))]
    {
        use crate::net::transport::OfflineTransport;
        use crate::state::token_store::MemoryStorage;
        (Rc::new(MemoryStorage::new()), Rc::new(OfflineTransport))
    }
}

fn build_services() -> AppServices {
    let config = ClientConfig::from_build_env().unwrap_or_else(|e| {
        log::warn!("{e}; using default configuration");
        ClientConfig::default()
    });
    let (storage, transport) = platform();
    AppServices::build(config, storage, transport, Rc::new(SystemClock))
}

/// Root application component.
///
/// Owns the one `SessionManager`, mirrors its changes into the `AuthState`
/// signal, and restores the stored session on start.
#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    let services = build_services();
    let auth = RwSignal::new(AuthState::default());
    services.session.subscribe(move |change| auth.update(|state| state.apply(change)));

    #[cfg(feature = "csr")]
    {
        let session = services.session.clone();
        leptos::task::spawn_local(async move {
            session.restore().await;
            auth.update(|state| state.restored = true);
        });
    }
    #[cfg(not(feature = "csr"))]
    auth.update(|state| state.restored = true);

    provide_context(auth);
    provide_context(StoredValue::<AppServices, LocalStorage>::new_local(services));

    view! {
        <Title text="CourseHub"/>

        <Router>
            <NavigationGuard>
                <Routes fallback=|| "Page not found.".into_view()>
                    <Route path=StaticSegment("") view=CoursesPage/>
                    <Route path=StaticSegment("courses") view=CoursesPage/>
                    <Route path=StaticSegment("login") view=LoginPage/>
                    <Route path=StaticSegment("dashboard") view=DashboardPage/>
                    <Route path=StaticSegment("profile") view=ProfilePage/>
                    <Route
                        path=StaticSegment(RoleArea::Admin.segment())
                        view=|| view! { <RoleAreaPage area=RoleArea::Admin/> }
                    />
                    <Route
                        path=StaticSegment(RoleArea::Instructor.segment())
                        view=|| view! { <RoleAreaPage area=RoleArea::Instructor/> }
                    />
                    <Route
                        path=StaticSegment(RoleArea::Student.segment())
                        view=|| view! { <RoleAreaPage area=RoleArea::Student/> }
                    />
                </Routes>
            </NavigationGuard>
        </Router>
    }
}
