//! Role areas: the admin, instructor and student sections linked from the
//! dashboard. The guard has already checked the role by the time one renders.

#[cfg(test)]
#[path = "area_test.rs"]
mod area_test;

use leptos::prelude::*;

use crate::state::auth::AuthState;
use crate::state::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleArea {
    Admin,
    Instructor,
    Student,
}

impl RoleArea {
    /// Most privileged first.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Instructor, Self::Student];

    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Instructor => "instructor",
            Self::Student => "student",
        }
    }

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Instructor => "/instructor",
            Self::Student => "/student",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Admin => "Administration",
            Self::Instructor => "Teaching",
            Self::Student => "My learning",
        }
    }

    /// Roles that open this area.
    #[must_use]
    pub fn roles(self) -> &'static [&'static str] {
        match self {
            Self::Admin => &["admin"],
            Self::Instructor => &["admin", "instructor"],
            Self::Student => &["admin", "instructor", "student"],
        }
    }

    #[must_use]
    pub fn is_open_to(self, session: &Session) -> bool {
        let held = session.roles();
        self.roles().iter().any(|role| held.contains(*role))
    }
}

#[component]
pub fn RoleAreaPage(area: RoleArea) -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthState>>();
    let name = move || auth.get().user().map(|u| u.display_name()).unwrap_or_default();

    view! {
        <div class="area-page">
            <header class="area-header">
                <h1>{area.title()}</h1>
                <p class="area-user">{name}</p>
            </header>
            <nav class="area-links">
                <a href="/dashboard">"Back to dashboard"</a>
                <a href="/courses">"Browse courses"</a>
            </nav>
        </div>
    }
}
