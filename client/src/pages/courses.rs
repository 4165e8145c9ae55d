//! Public course catalog.

#[cfg(test)]
#[path = "courses_test.rs"]
mod courses_test;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;

use crate::context::AppServices;
use crate::net::types::Course;

fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) if p > 0.0 => format!("${p:.2}"),
        _ => "Free".to_owned(),
    }
}

/// One-line description under the course title.
fn course_summary(course: &Course) -> String {
    let mut parts = Vec::new();
    if let Some(level) = course.level.as_deref().filter(|l| !l.is_empty()) {
        parts.push(level.to_owned());
    }
    parts.push(format_price(course.price));
    if let Some(name) = course.instructor_name.as_deref().filter(|n| !n.is_empty()) {
        parts.push(format!("by {name}"));
    }
    if !course.videos.is_empty() {
        let n = course.videos.len();
        parts.push(format!("{n} video{}", if n == 1 { "" } else { "s" }));
    }
    parts.join(" · ")
}

#[component]
pub fn CoursesPage() -> impl IntoView {
    let services = expect_context::<StoredValue<AppServices, LocalStorage>>();
    let courses = RwSignal::new(Vec::<Course>::new());
    let loading = RwSignal::new(true);
    let error = RwSignal::new(None::<String>);

    #[cfg(feature = "csr")]
    {
        let backend = services.with_value(|s| s.backend.clone());
        leptos::task::spawn_local(async move {
            match backend.list_courses().await {
                Ok(list) => courses.set(list),
                Err(e) => {
                    log::warn!("courses: catalog load failed: {e}");
                    error.set(Some(e.user_message()));
                }
            }
            loading.set(false);
        });
    }
    #[cfg(not(feature = "csr"))]
    {
        let _ = services;
        loading.set(false);
    }

    view! {
        <div class="courses-page">
            <h1>"Courses"</h1>
            <Show when=move || loading.get()>
                <p class="courses-loading">"Loading courses..."</p>
            </Show>
            <Show when=move || error.get().is_some()>
                <p class="courses-error">{move || error.get().unwrap_or_default()}</p>
            </Show>
            <ul class="course-list">
                <For each=move || courses.get() key=|course| course.id let:course>
                    <li class="course-card">
                        <h2>{course.title.clone()}</h2>
                        <p class="course-card__meta">{course_summary(&course)}</p>
                        <p class="course-card__description">{course.description.clone().unwrap_or_default()}</p>
                    </li>
                </For>
            </ul>
        </div>
    }
}
