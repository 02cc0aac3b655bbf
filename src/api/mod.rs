//! Client for the remote todo-list REST API.
//!
//! [`ApiClient`] owns the HTTP connection pool, the validated base URL and the
//! bearer token. Endpoint methods are split by resource: users, categories,
//! and tasks. Every method maps 1:1 onto a server route and performs no local
//! state changes; optimistic bookkeeping lives in [`crate::store`].

mod categories;
mod client;
mod tasks;
mod types;
mod users;

pub use client::{ApiClient, ApiError, DEFAULT_TIMEOUT};
pub use types::{Category, Credentials, Profile, ProfileUpdate, Task, TaskPatch};
