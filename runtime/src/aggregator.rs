//! The todo aggregator.
//!
//! Merges the owner's Remote Document Store records with the Public Todo Feed,
//! serves client-side pages of the merged list, and routes mutations to the
//! store that owns each record.
//!
//! # Concurrency
//!
//! State sits behind a synchronous `RwLock` that is never held across an
//! `.await`. Operations may interleave freely; two rules keep the state
//! coherent:
//!
//! - every call raises its busy flag on entry and a drop guard lowers it,
//!   including when the call fails or its future is dropped
//! - each `load` takes a generation number and commits only if no newer
//!   `load` started meanwhile, so the latest load wins

use crate::state::{Operation, TodoListState};
use horizon_todo_core::environment::{Clock, DocumentStore, Query, TodoFeed};
use horizon_todo_core::error::{Result, TodoError};
use horizon_todo_core::identity::AuthSession;
use horizon_todo_core::todo::{NewTodo, Todo, TodoId, TodoPatch};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Instant;

/// Collection holding the todo documents.
pub const DEFAULT_COLLECTION: &str = "todos";

/// Number of records requested from the Public Todo Feed.
pub const DEFAULT_FEED_LIMIT: usize = 200;

/// Longest accepted title, in bytes.
pub const MAX_TITLE_LEN: usize = 500;

/// Environment dependencies for the aggregator
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Remote Document Store
    pub store: Arc<dyn DocumentStore>,
    /// Public Todo Feed
    pub feed: Arc<dyn TodoFeed>,
    /// Authentication state
    pub session: AuthSession,
    /// Clock for creation timestamps
    pub clock: Arc<dyn Clock>,
    /// Collection holding the todo documents
    pub collection: String,
    /// Number of feed records to request
    pub feed_limit: usize,
}

impl TodoEnvironment {
    /// Creates an environment with the default collection and feed limit.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        feed: Arc<dyn TodoFeed>,
        session: AuthSession,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            feed,
            session,
            clock,
            collection: DEFAULT_COLLECTION.to_string(),
            feed_limit: DEFAULT_FEED_LIMIT,
        }
    }

    /// Uses another collection.
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Requests another number of feed records.
    #[must_use]
    pub const fn with_feed_limit(mut self, feed_limit: usize) -> Self {
        self.feed_limit = feed_limit;
        self
    }
}

/// Merged, paginated todo list over two backing stores.
///
/// Cloning is cheap; clones share state.
///
/// # Example
///
/// ```ignore
/// let aggregator = TodoAggregator::new(env, NonZeroUsize::new(10).unwrap());
///
/// aggregator.load(1).await;
/// let page = aggregator.state(|s| s.todos.clone());
///
/// let todo = aggregator.add("Buy milk").await?;
/// aggregator.update(&todo.id, TodoPatch::new().completed(true)).await?;
/// aggregator.delete(&todo.id).await?;
/// ```
#[derive(Clone)]
pub struct TodoAggregator {
    state: Arc<RwLock<TodoListState>>,
    env: Arc<TodoEnvironment>,
    load_generation: Arc<AtomicU64>,
}

impl TodoAggregator {
    /// Creates an aggregator with an empty list.
    #[must_use]
    pub fn new(env: TodoEnvironment, page_size: NonZeroUsize) -> Self {
        Self {
            state: Arc::new(RwLock::new(TodoListState::new(page_size))),
            env: Arc::new(env),
            load_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Injected dependencies.
    #[must_use]
    pub fn environment(&self) -> &TodoEnvironment {
        &self.env
    }

    /// Reads state through `f`.
    pub fn state<T>(&self, f: impl FnOnce(&TodoListState) -> T) -> T {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Clones the whole state.
    #[must_use]
    pub fn snapshot(&self) -> TodoListState {
        self.state(Clone::clone)
    }

    /// Loads both sources and shows page `page` (1-indexed) of the merged list.
    ///
    /// Remote records are read only when a principal is signed in, and only
    /// the principal's own records are kept. Failures are recorded in the
    /// `error` field and leave the lists untouched; they are not returned.
    /// A load superseded by a newer one is discarded.
    pub async fn load(&self, page: usize) {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _busy = self.begin(Operation::Load);
        metrics::counter!("todo.load.total").increment(1);

        let started = Instant::now();
        let result = self.fetch_merged().await;
        metrics::histogram!("todo.load.duration_seconds").record(started.elapsed().as_secs_f64());

        let mut state = self.write();
        if self.load_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(page, generation, "discarding result of superseded load");
            metrics::counter!("todo.load.stale").increment(1);
            return;
        }
        match result {
            Ok(merged) => {
                tracing::info!(page, total = merged.len(), "todos loaded");
                state.apply_loaded(merged, page);
            }
            Err(err) => {
                tracing::warn!(page, error = %err, "failed to load todos");
                metrics::counter!("todo.operation.failed", "operation" => Operation::Load.as_str())
                    .increment(1);
                state.fail(err.to_string());
            }
        }
    }

    /// Creates a todo in the Remote Document Store and shows it at the head
    /// of the current page.
    ///
    /// # Errors
    ///
    /// - [`TodoError::Unauthenticated`] when nobody is signed in (nothing is written)
    /// - [`TodoError::Validation`] for a blank or overlong title
    /// - [`TodoError::Store`] when the write fails
    ///
    /// The error is also recorded in the `error` field.
    pub async fn add(&self, title: &str) -> Result<Todo> {
        let _busy = self.begin(Operation::Add);
        let result = self.create_todo(title).await;
        self.settle(Operation::Add, result, |state, todo| {
            state.apply_added(todo.clone());
            todo
        })
    }

    /// Applies `patch` to todo `id` in the store that owns it.
    ///
    /// Feed records are updated through a simulated request: the change is
    /// visible in this session only. Returns the patched record from the
    /// displayed page, or from the full list when it is not on the page, or
    /// `None` when the id is in neither.
    ///
    /// # Errors
    ///
    /// - [`TodoError::Validation`] for an empty patch
    /// - [`TodoError::Feed`] / [`TodoError::Store`] when the upstream call fails
    pub async fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<Option<Todo>> {
        let _busy = self.begin(Operation::Update);
        let result = self.send_update(id, &patch).await;
        self.settle(Operation::Update, result, |state, ()| {
            let updated = state.apply_updated(id, &patch);
            if updated.is_none() {
                tracing::debug!(%id, "updated todo is not in the merged list");
            }
            updated
        })
    }

    /// Deletes todo `id` from the store that owns it and from every local list.
    ///
    /// Feed records are deleted through a simulated request: they come back
    /// on the next load.
    ///
    /// # Errors
    ///
    /// [`TodoError::Feed`] / [`TodoError::Store`] when the upstream call fails.
    pub async fn delete(&self, id: &TodoId) -> Result<()> {
        let _busy = self.begin(Operation::Delete);
        let result = self.send_delete(id).await;
        self.settle(Operation::Delete, result, |state, ()| {
            state.apply_deleted(id);
        })
    }

    /// Searches titles in the full merged list.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Todo> {
        self.state(|s| s.search(query))
    }

    /// Looks up a record in the full merged list.
    #[must_use]
    pub fn find(&self, id: &TodoId) -> Option<Todo> {
        self.state(|s| s.find(id).cloned())
    }

    async fn fetch_merged(&self) -> Result<Vec<Todo>> {
        let env = &*self.env;
        let principal = env.session.current().await;

        let remote = async {
            let Some(principal) = principal else {
                return Ok(Vec::new());
            };
            let query = Query::newest_first(env.collection.as_str()).owned_by(principal.uid.clone());
            let mut owned: Vec<Todo> = env
                .store
                .query(&query)
                .await?
                .into_iter()
                .filter(|t| t.is_owned_by(&principal.uid))
                .collect();
            // Stable: ties keep the store's order.
            owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok::<_, TodoError>(owned)
        };
        let feed = async { env.feed.fetch_todos(env.feed_limit).await.map_err(TodoError::from) };

        let (remote, feed) = futures::join!(remote, feed);
        let mut merged = remote?;
        merged.extend(feed?);
        Ok(merged)
    }

    async fn create_todo(&self, title: &str) -> Result<Todo> {
        let principal = self
            .env
            .session
            .current()
            .await
            .ok_or(TodoError::Unauthenticated)?;

        let title = title.trim();
        if title.is_empty() {
            return Err(TodoError::Validation("title cannot be empty".to_string()));
        }
        if title.len() > MAX_TITLE_LEN {
            return Err(TodoError::Validation(format!(
                "title too long (max {MAX_TITLE_LEN} characters)"
            )));
        }

        let new_todo = NewTodo::new(title, self.env.clock.now(), principal.uid);
        let id = self.env.store.create(&self.env.collection, &new_todo).await?;

        tracing::info!(%id, "todo created");
        metrics::counter!("todo.add.total").increment(1);
        Ok(new_todo.into_todo(id))
    }

    async fn send_update(&self, id: &TodoId, patch: &TodoPatch) -> Result<()> {
        if patch.is_empty() {
            return Err(TodoError::Validation("nothing to update".to_string()));
        }

        let source = id.source();
        tracing::debug!(%id, %source, "routing update");
        match id {
            TodoId::Feed(n) => self.env.feed.update(*n, patch).await?,
            TodoId::Remote(doc) => {
                self.env
                    .store
                    .update_fields(&self.env.collection, doc, patch)
                    .await?;
            }
        }
        metrics::counter!("todo.update.total", "source" => source.as_str()).increment(1);
        Ok(())
    }

    async fn send_delete(&self, id: &TodoId) -> Result<()> {
        let source = id.source();
        tracing::debug!(%id, %source, "routing delete");
        match id {
            TodoId::Feed(n) => self.env.feed.delete(*n).await?,
            TodoId::Remote(doc) => self.env.store.delete(&self.env.collection, doc).await?,
        }
        metrics::counter!("todo.delete.total", "source" => source.as_str()).increment(1);
        Ok(())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TodoListState> {
        write_state(&self.state)
    }

    fn begin(&self, op: Operation) -> BusyGuard<'_> {
        self.write().begin(op);
        BusyGuard {
            state: &self.state,
            op,
        }
    }

    /// Records the outcome of a mutation and hands it back to the caller.
    fn settle<T, U>(
        &self,
        op: Operation,
        result: Result<T>,
        apply: impl FnOnce(&mut TodoListState, T) -> U,
    ) -> Result<U> {
        let mut state = self.write();
        match result {
            Ok(value) => Ok(apply(&mut state, value)),
            Err(err) => {
                tracing::warn!(operation = %op, error = %err, "todo operation failed");
                metrics::counter!("todo.operation.failed", "operation" => op.as_str()).increment(1);
                state.fail(err.to_string());
                Err(err)
            }
        }
    }
}

fn write_state(lock: &RwLock<TodoListState>) -> RwLockWriteGuard<'_, TodoListState> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Lowers a busy flag when dropped.
struct BusyGuard<'a> {
    state: &'a RwLock<TodoListState>,
    op: Operation,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        write_state(self.state).finish(self.op);
    }
}
