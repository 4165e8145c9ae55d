//! Session core: token decoding, route guarding and session lifecycle.
//!
//! ARCHITECTURE
//! ============
//! `jwt` reads expiry and role hints out of access tokens, `guard` turns a
//! path plus a session into an allow/redirect decision, and `manager` owns
//! the one live session and everything that mutates it.

pub mod guard;
pub mod jwt;
pub mod manager;
