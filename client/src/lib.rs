//! # coursehub-client
//!
//! Leptos + WASM front end for the course catalog, dashboard and profile
//! views. The interesting part is the session core: a token store, a route
//! guard and a bearer-token HTTP client wrapped around an external OIDC
//! identity provider.
//!
//! Everything outside `#[cfg(feature = "csr")]` compiles natively so the
//! session core can be tested with plain `cargo test`.

pub mod app;
pub mod auth;
pub mod components;
pub mod config;
pub mod context;
pub mod error;
pub mod net;
pub mod pages;
pub mod state;
pub mod util;

/// Browser entry point: install console logging and mount the app.
#[cfg(feature = "csr")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    leptos::mount::mount_to_body(app::App);
}
