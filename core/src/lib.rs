//! # Horizon Todo Core
//!
//! Domain types and collaborator traits for the Horizon Todo aggregator.
//!
//! The aggregator merges two heterogeneous sources into one paginated list:
//!
//! - **Remote Document Store**: persistent, per-user todo documents
//! - **Public Todo Feed**: read-mostly sample todos whose mutations are simulated
//!
//! This crate holds everything that does not perform I/O itself:
//!
//! - [`todo`]: the `Todo` record and its source-tagged [`TodoId`]
//! - [`pagination`]: client-side page arithmetic
//! - [`identity`]: the current principal and its one-time resolution
//! - [`environment`]: injected dependencies (`Clock`, `DocumentStore`, `TodoFeed`, `IdentityProvider`)
//! - [`error`]: the error taxonomy shared by adapters and the aggregator
//!
//! ## Example
//!
//! ```
//! use horizon_todo_core::todo::{TodoId, TodoSource};
//! use horizon_todo_core::pagination::total_pages;
//! use std::num::NonZeroUsize;
//!
//! // Untyped ids from the outside world are routed once, at parse time
//! assert_eq!(TodoId::parse("42").source(), TodoSource::PublicFeed);
//! assert_eq!(TodoId::parse("AbC123xyz").source(), TodoSource::RemoteStore);
//!
//! let size = NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN);
//! assert_eq!(total_pages(23, size), 3);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod environment;
pub mod error;
pub mod identity;
pub mod pagination;
pub mod todo;

pub use environment::{
    BoxFuture, Clock, DocumentStore, IdentityProvider, OrderBy, Query, SortDirection, SystemClock,
    TodoFeed,
};
pub use error::{AuthError, FeedError, StoreError, TodoError};
pub use identity::{AuthSession, Principal, UserId};
pub use pagination::Pagination;
pub use todo::{NewTodo, Todo, TodoId, TodoPatch, TodoSource};
