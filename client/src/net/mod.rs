//! Networking: transport seam, identity provider, and backend REST calls.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` abstracts the HTTP stack, `provider` speaks to the identity
//! provider, `api` wraps protected backend calls with the bearer and 401
//! rules, `services` names the backend endpoints, and `types` holds the wire
//! schema.

pub mod api;
pub mod provider;
pub mod services;
pub mod transport;
pub mod types;
