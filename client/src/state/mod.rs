//! Session data model, durable token storage, and the reactive auth snapshot.

pub mod auth;
pub mod session;
pub mod token_store;
