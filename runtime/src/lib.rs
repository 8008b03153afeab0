//! # Horizon Todo Runtime
//!
//! Runtime for the Horizon Todo aggregator.
//!
//! ## Core Components
//!
//! - **`TodoAggregator`**: owns the list state, performs the remote calls and
//!   applies their outcome
//! - **`TodoListState`**: displayed page, merged list, local mirror, busy
//!   flags, status messages and pagination
//! - **Navigation guard**: keeps signed-out users away from protected views
//!
//! ## Example
//!
//! ```ignore
//! use horizon_todo_runtime::{TodoAggregator, TodoEnvironment};
//!
//! let aggregator = TodoAggregator::new(env, page_size);
//!
//! aggregator.load(1).await;
//! let (page, total_pages) = aggregator.state(|s| (s.todos.clone(), s.pagination.total_pages));
//! ```

pub mod aggregator;
pub mod navigation;
pub mod state;

pub use aggregator::{TodoAggregator, TodoEnvironment};
pub use navigation::{Navigation, Route, guard};
pub use state::{Operation, TodoListState};
