//! # Horizon Todo Testing
//!
//! Testing utilities for the Horizon Todo aggregator.
//!
//! This crate provides:
//! - In-memory implementations of the environment traits ([`mocks`])
//! - Fixture builders for principals and todos ([`fixtures`])
//!
//! ## Example
//!
//! ```ignore
//! use horizon_todo_testing::{InMemoryDocumentStore, MockTodoFeed, test_clock};
//!
//! #[tokio::test]
//! async fn loads_feed_when_signed_out() {
//!     let feed = MockTodoFeed::with_todos(fixtures::feed_todos(3));
//!     let env = TodoEnvironment::new(
//!         Arc::new(InMemoryDocumentStore::new()),
//!         Arc::new(feed),
//!         AuthSession::resolved(None),
//!         Arc::new(test_clock()),
//!     );
//!     let aggregator = TodoAggregator::new(env, page_size(10));
//!     aggregator.load(1).await;
//!     assert_eq!(aggregator.state(|s| s.todos.len()), 3);
//! }
//! ```

pub mod fixtures;
pub mod mocks;

// Re-export commonly used items
pub use mocks::{
    FeedCall, FixedClock, InMemoryDocumentStore, MockIdentityProvider, MockTodoFeed, StoreCall,
    test_clock,
};
