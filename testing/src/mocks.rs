//! Mock implementations of the environment traits.
//!
//! Every mock records the calls it receives and can be told to fail its next
//! call, so tests can assert both on routing and on error handling.

use chrono::{DateTime, Utc};
use horizon_todo_core::environment::{
    BoxFuture, Clock, DocumentStore, IdentityProvider, Query, SortDirection, TodoFeed,
};
use horizon_todo_core::error::{AuthError, FeedError, StoreError};
use horizon_todo_core::identity::{AuthSession, Principal, UserId};
use horizon_todo_core::todo::{NewTodo, Todo, TodoId, TodoPatch};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fixed clock for deterministic tests
///
/// Always returns the same time, making tests reproducible.
///
/// # Example
///
/// ```
/// use horizon_todo_testing::mocks::FixedClock;
/// use horizon_todo_core::environment::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .map_or(DateTime::<Utc>::UNIX_EPOCH, |t| t.with_timezone(&Utc)),
    )
}

// ═══════════════════════════════════════════════════════════════════════
// Document store
// ═══════════════════════════════════════════════════════════════════════

/// A call received by [`InMemoryDocumentStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    /// `query`
    Query {
        /// Collection read
        collection: String,
        /// Owner filter sent with the query
        owner: Option<UserId>,
    },
    /// `create`
    Create {
        /// Collection written
        collection: String,
        /// Record written
        todo: NewTodo,
    },
    /// `update_fields`
    Update {
        /// Collection written
        collection: String,
        /// Document id
        id: String,
        /// Fields written
        patch: TodoPatch,
    },
    /// `delete`
    Delete {
        /// Collection written
        collection: String,
        /// Document id
        id: String,
    },
}

#[derive(Debug)]
struct StoreInner {
    documents: Vec<(String, Todo)>,
    next_id: u64,
    calls: Vec<StoreCall>,
    next_failure: Option<StoreError>,
    honor_owner_filter: bool,
}

/// In-memory Remote Document Store.
///
/// Generated ids are `doc-1`, `doc-2`, ... Queries sort on `createdAt`.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store that applies owner filters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                documents: Vec::new(),
                next_id: 1,
                calls: Vec::new(),
                next_failure: None,
                honor_owner_filter: true,
            })),
        }
    }

    /// Creates an empty store whose queries ignore the owner filter and
    /// return every user's documents.
    #[must_use]
    pub fn ignoring_owner_filter() -> Self {
        let store = Self::new();
        lock(&store.inner).honor_owner_filter = false;
        store
    }

    /// Seeds `collection` with `todos`.
    #[must_use]
    pub fn with_documents(self, collection: &str, todos: impl IntoIterator<Item = Todo>) -> Self {
        for todo in todos {
            self.insert(collection, todo);
        }
        self
    }

    /// Stores `todo` as is. Non-remote ids are ignored.
    pub fn insert(&self, collection: &str, todo: Todo) {
        if matches!(todo.id, TodoId::Remote(_)) {
            lock(&self.inner)
                .documents
                .push((collection.to_string(), todo));
        }
    }

    /// Makes the next call fail with `error`.
    pub fn fail_next(&self, error: StoreError) {
        lock(&self.inner).next_failure = Some(error);
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.inner).calls.clone()
    }

    /// Documents of `collection`, in insertion order.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Todo> {
        lock(&self.inner)
            .documents
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, todo)| todo.clone())
            .collect()
    }

    fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner);
        inner.calls.push(call);
        inner.next_failure.take().map_or(Ok(()), Err)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn query<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Vec<Todo>, StoreError>> {
        Box::pin(async move {
            self.record(StoreCall::Query {
                collection: query.collection.clone(),
                owner: query.owner.clone(),
            })?;

            let inner = lock(&self.inner);
            let mut todos: Vec<Todo> = inner
                .documents
                .iter()
                .filter(|(c, _)| *c == query.collection)
                .map(|(_, todo)| todo)
                .filter(|todo| match (&query.owner, inner.honor_owner_filter) {
                    (Some(owner), true) => todo.is_owned_by(owner),
                    _ => true,
                })
                .cloned()
                .collect();
            drop(inner);

            todos.sort_by(|a, b| match query.order_by.direction {
                SortDirection::Ascending => a.created_at.cmp(&b.created_at),
                SortDirection::Descending => b.created_at.cmp(&a.created_at),
            });
            Ok(todos)
        })
    }

    fn create<'a>(
        &'a self,
        collection: &'a str,
        todo: &'a NewTodo,
    ) -> BoxFuture<'a, Result<String, StoreError>> {
        Box::pin(async move {
            self.record(StoreCall::Create {
                collection: collection.to_string(),
                todo: todo.clone(),
            })?;

            let mut inner = lock(&self.inner);
            let id = format!("doc-{}", inner.next_id);
            inner.next_id += 1;
            inner
                .documents
                .push((collection.to_string(), todo.clone().into_todo(id.clone())));
            Ok(id)
        })
    }

    fn update_fields<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        patch: &'a TodoPatch,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.record(StoreCall::Update {
                collection: collection.to_string(),
                id: id.to_string(),
                patch: patch.clone(),
            })?;

            let target = TodoId::remote(id);
            let mut inner = lock(&self.inner);
            let todo = inner
                .documents
                .iter_mut()
                .find(|(c, todo)| c == collection && todo.id == target)
                .map(|(_, todo)| todo)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            todo.apply(patch);
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.record(StoreCall::Delete {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

            let target = TodoId::remote(id);
            lock(&self.inner)
                .documents
                .retain(|(c, todo)| !(c == collection && todo.id == target));
            Ok(())
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Public feed
// ═══════════════════════════════════════════════════════════════════════

/// A call received by [`MockTodoFeed`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedCall {
    /// `fetch_todos`
    Fetch {
        /// Requested limit
        limit: usize,
    },
    /// `update`
    Update {
        /// Feed id
        id: u32,
        /// Fields sent
        patch: TodoPatch,
    },
    /// `delete`
    Delete {
        /// Feed id
        id: u32,
    },
}

#[derive(Debug, Default)]
struct FeedInner {
    todos: Vec<Todo>,
    calls: Vec<FeedCall>,
    next_failure: Option<FeedError>,
    fetch_delays: VecDeque<Duration>,
}

/// Mock Public Todo Feed.
///
/// Like the real feed, updates and deletes succeed without changing what
/// the next fetch returns.
#[derive(Debug, Clone, Default)]
pub struct MockTodoFeed {
    inner: Arc<Mutex<FeedInner>>,
}

impl MockTodoFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a feed serving `todos`.
    #[must_use]
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        let feed = Self::new();
        lock(&feed.inner).todos = todos;
        feed
    }

    /// Makes the next call fail with `error`.
    pub fn fail_next(&self, error: FeedError) {
        lock(&self.inner).next_failure = Some(error);
    }

    /// Delays upcoming fetches, one entry per fetch, in order.
    pub fn delay_fetches(&self, delays: impl IntoIterator<Item = Duration>) {
        lock(&self.inner).fetch_delays.extend(delays);
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<FeedCall> {
        lock(&self.inner).calls.clone()
    }

    fn record(&self, call: FeedCall) -> Result<(), FeedError> {
        let mut inner = lock(&self.inner);
        inner.calls.push(call);
        inner.next_failure.take().map_or(Ok(()), Err)
    }
}

impl TodoFeed for MockTodoFeed {
    fn fetch_todos(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Todo>, FeedError>> {
        Box::pin(async move {
            let delay = lock(&self.inner).fetch_delays.pop_front();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.record(FeedCall::Fetch { limit })?;
            Ok(lock(&self.inner).todos.iter().take(limit).cloned().collect())
        })
    }

    fn update<'a>(&'a self, id: u32, patch: &'a TodoPatch) -> BoxFuture<'a, Result<(), FeedError>> {
        Box::pin(async move {
            self.record(FeedCall::Update {
                id,
                patch: patch.clone(),
            })
        })
    }

    fn delete(&self, id: u32) -> BoxFuture<'_, Result<(), FeedError>> {
        Box::pin(async move { self.record(FeedCall::Delete { id }) })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════

/// Mock email/password identity provider.
///
/// Accounts live in memory; uids are `user-1`, `user-2`, ...
#[derive(Debug, Clone)]
pub struct MockIdentityProvider {
    session: AuthSession,
    accounts: Arc<Mutex<HashMap<String, (String, UserId)>>>,
}

impl MockIdentityProvider {
    /// Creates a provider with no accounts, publishing to `session`.
    #[must_use]
    pub fn new(session: AuthSession) -> Self {
        Self {
            session,
            accounts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers an account without signing in.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str, uid: &str) -> Self {
        lock(&self.accounts).insert(
            email.to_string(),
            (password.to_string(), UserId::new(uid)),
        );
        self
    }

    fn principal(uid: UserId, email: &str) -> Principal {
        let token = format!("token-{uid}");
        Principal::new(uid).with_email(email).with_id_token(token)
    }
}

impl IdentityProvider for MockIdentityProvider {
    fn session(&self) -> AuthSession {
        self.session.clone()
    }

    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Principal, AuthError>> {
        Box::pin(async move {
            let uid = match lock(&self.accounts).get(email) {
                Some((stored, uid)) if stored == password => uid.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            };
            let principal = Self::principal(uid, email);
            self.session.publish(Some(principal.clone()));
            Ok(principal)
        })
    }

    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Principal, AuthError>> {
        Box::pin(async move {
            let uid = {
                let mut accounts = lock(&self.accounts);
                if accounts.contains_key(email) {
                    return Err(AuthError::EmailExists);
                }
                let uid = UserId::new(format!("user-{}", accounts.len() + 1));
                accounts.insert(email.to_string(), (password.to_string(), uid.clone()));
                uid
            };
            let principal = Self::principal(uid, email);
            self.session.publish(Some(principal.clone()));
            Ok(principal)
        })
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        Box::pin(async move {
            self.session.publish(None);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::fixtures::{at, remote_todo};

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn store_filters_and_sorts() {
        let store = InMemoryDocumentStore::new().with_documents(
            "todos",
            [
                remote_todo("a", "old", at(10), "u1"),
                remote_todo("b", "other user", at(20), "u2"),
                remote_todo("c", "new", at(30), "u1"),
            ],
        );

        let query = Query::newest_first("todos").owned_by(UserId::new("u1"));
        let ids: Vec<TodoId> = store.query(&query).await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![TodoId::remote("c"), TodoId::remote("a")]);
    }

    #[tokio::test]
    async fn store_failure_is_one_shot() {
        let store = InMemoryDocumentStore::new();
        store.fail_next(StoreError::Request("offline".into()));
        let query = Query::newest_first("todos");
        assert!(store.query(&query).await.is_err());
        assert!(store.query(&query).await.is_ok());
        assert_eq!(store.calls().len(), 2);
    }

    #[tokio::test]
    async fn store_update_of_missing_document_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let result = store
            .update_fields("todos", "ghost", &TodoPatch::new().completed(true))
            .await;
        assert_eq!(result, Err(StoreError::NotFound("ghost".into())));
    }

    #[tokio::test]
    async fn feed_mutations_do_not_persist() {
        let feed = MockTodoFeed::with_todos(crate::fixtures::feed_todos(3));
        feed.delete(1).await.unwrap();
        assert_eq!(feed.fetch_todos(200).await.unwrap().len(), 3);
        assert_eq!(feed.fetch_todos(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn identity_provider_publishes_to_session() {
        let session = AuthSession::new();
        let provider =
            MockIdentityProvider::new(session.clone()).with_account("a@example.com", "pw", "u1");

        assert_eq!(
            provider.sign_in("a@example.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        );
        assert!(!session.is_resolved());

        provider.sign_in("a@example.com", "pw").await.unwrap();
        assert_eq!(session.current().await.map(|p| p.uid), Some(UserId::new("u1")));

        assert_eq!(
            provider.sign_up("a@example.com", "pw").await,
            Err(AuthError::EmailExists)
        );

        provider.sign_out().await.unwrap();
        assert_eq!(session.current().await, None);
    }
}
