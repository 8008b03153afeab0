//! Public Todo Feed client.
//!
//! Talks to a JSONPlaceholder-compatible API:
//!
//! - `GET /todos?_limit=N` returns a JSON array of `{id, title, completed, ...}`
//! - `PUT /todos/{id}` echoes the body back without storing it
//! - `DELETE /todos/{id}` answers success without deleting anything
//!
//! Records are tagged [`TodoId::Feed`](horizon_todo_core::todo::TodoId::Feed)
//! when decoded.

pub mod client;

pub use client::{DEFAULT_BASE_URL, JsonPlaceholderClient};
