//! Request-independent helpers used by handlers.

pub mod cookies;
