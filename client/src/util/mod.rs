//! Small helpers with no page of their own: the time source and the
//! reactive redirect hook.

pub mod auth;
pub mod clock;
