//! Reusable UI component modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Components read shared state from Leptos context providers installed by
//! `app::App`.

pub mod navigation_guard;
