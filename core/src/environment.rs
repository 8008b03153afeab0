//! Dependency injection traits.
//!
//! All external collaborators of the aggregator are abstracted behind traits
//! and injected through its environment:
//!
//! - [`Clock`]: creation timestamps
//! - [`DocumentStore`]: the Remote Document Store
//! - [`TodoFeed`]: the Public Todo Feed
//! - [`IdentityProvider`]: sign-in and the shared [`AuthSession`]
//!
//! # Dyn Compatibility
//!
//! The I/O traits return [`BoxFuture`] instead of using `async fn` so they can
//! be held as `Arc<dyn DocumentStore>` and friends.

use crate::error::{AuthError, FeedError, StoreError};
use crate::identity::{AuthSession, Principal, UserId};
use crate::todo::{NewTodo, Todo, TodoPatch};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future returned by collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Sort direction of a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Ordering of a query by one document field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    /// Field path, e.g. `createdAt`
    pub field: String,
    /// Direction
    pub direction: SortDirection,
}

impl OrderBy {
    /// Orders by `field`, largest first.
    #[must_use]
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// A read of a whole collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    /// Collection to read
    pub collection: String,
    /// Only documents whose `userId` equals this value, if set
    pub owner: Option<UserId>,
    /// Result ordering
    pub order_by: OrderBy,
}

impl Query {
    /// All documents of `collection`, newest first.
    #[must_use]
    pub fn newest_first(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            owner: None,
            order_by: OrderBy::descending("createdAt"),
        }
    }

    /// Restricts the query to documents owned by `owner`.
    #[must_use]
    pub fn owned_by(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// The Remote Document Store.
///
/// Documents are schemaless key/value records; implementations map the
/// fields `title`, `completed`, `createdAt` and `userId` onto [`Todo`] and
/// tag every returned record with [`TodoId::Remote`](crate::todo::TodoId::Remote).
pub trait DocumentStore: Send + Sync {
    /// Reads the documents matching `query`, in the requested order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails or a document cannot be decoded.
    fn query<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Vec<Todo>, StoreError>>;

    /// Writes a new document and returns its generated id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    fn create<'a>(
        &'a self,
        collection: &'a str,
        todo: &'a NewTodo,
    ) -> BoxFuture<'a, Result<String, StoreError>>;

    /// Writes the fields set in `patch` to document `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the document does not exist, or
    /// another [`StoreError`] if the write fails.
    fn update_fields<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        patch: &'a TodoPatch,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Deletes document `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    fn delete<'a>(&'a self, collection: &'a str, id: &'a str)
    -> BoxFuture<'a, Result<(), StoreError>>;
}

/// The Public Todo Feed.
///
/// Mutations are simulated upstream: a success response does not mean the
/// change was stored.
pub trait TodoFeed: Send + Sync {
    /// Fetches up to `limit` todos, in feed order.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] on transport failure, non-success status or bad JSON.
    fn fetch_todos(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Todo>, FeedError>>;

    /// Sends a simulated update of todo `id`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] on transport failure or non-success status.
    fn update<'a>(&'a self, id: u32, patch: &'a TodoPatch) -> BoxFuture<'a, Result<(), FeedError>>;

    /// Sends a simulated delete of todo `id`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] on transport failure or non-success status.
    fn delete(&self, id: u32) -> BoxFuture<'_, Result<(), FeedError>>;
}

/// Email/password identity provider.
///
/// Every successful sign-in, sign-up or sign-out is published to the
/// provider's [`AuthSession`].
pub trait IdentityProvider: Send + Sync {
    /// Handle to the authentication state this provider publishes to.
    fn session(&self) -> AuthSession;

    /// Signs in an existing user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for a wrong email or password.
    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Principal, AuthError>>;

    /// Registers and signs in a new user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailExists`] if the email is already registered.
    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Principal, AuthError>>;

    /// Signs the current user out.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the provider rejects the request.
    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>>;
}
