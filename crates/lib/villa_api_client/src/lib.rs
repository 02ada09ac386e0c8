//! # villa_api_client
//!
//! HTTP client for the Magic Villa API. Keeps the session's token pair in a
//! [`TokenStore`], attaches the access token to authenticated calls and
//! refreshes it transparently when the server answers `401`.

pub mod claims;
pub mod client;
pub mod error;
pub mod models;
pub mod session;
pub mod store;

pub use client::{ApiClient, ClientConfig};
pub use error::{ClientError, Result};
pub use models::{SessionUser, TokenPair};
pub use session::SessionScope;
pub use store::{FileTokenStore, MemoryTokenStore, StoredSession, TokenStore};
