//! Client for a todo-list REST API.
//!
//! Categories and tasks are cached locally and edited optimistically: every
//! change shows up immediately and is rolled back if the server rejects it.
//! [`workspace::Workspace`] ties the stores, the selection, and the task
//! editor together; the `taskflow` binary drives it from the command line.

pub mod account;
pub mod api;
pub mod config;
pub mod store;
pub mod util;
pub mod workspace;
