//! Page modules for route-level screens.
//!
//! ARCHITECTURE
//! ============
//! Pages read `AuthState` and `AppServices` from context. None of them
//! decide on redirects; `NavigationGuard` does that for every route.

pub mod area;
pub mod courses;
pub mod dashboard;
pub mod login;
pub mod profile;
