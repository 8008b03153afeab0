//! JSONPlaceholder client implementation

use horizon_todo_core::environment::{BoxFuture, TodoFeed};
use horizon_todo_core::error::FeedError;
use horizon_todo_core::todo::{Todo, TodoPatch};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;

/// Public JSONPlaceholder endpoint.
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// Todo as served by the feed. Extra fields (`userId`) are ignored.
#[derive(Debug, Deserialize)]
struct FeedTodo {
    id: u32,
    title: String,
    completed: bool,
}

impl From<FeedTodo> for Todo {
    fn from(todo: FeedTodo) -> Self {
        Self::from_feed(todo.id, todo.title, todo.completed)
    }
}

/// JSONPlaceholder API client
#[derive(Clone, Debug)]
pub struct JsonPlaceholderClient {
    client: Client,
    base_url: String,
}

impl JsonPlaceholderClient {
    /// Create a client for `base_url` (no trailing slash needed).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Request` if the HTTP client cannot be built.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn todo_url(&self, id: u32) -> String {
        format!("{}/todos/{id}", self.base_url)
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Todo>, FeedError> {
        let response = self
            .client
            .get(format!("{}/todos", self.base_url))
            .query(&[("_limit", limit)])
            .send()
            .await
            .map_err(|e| FeedError::Request(e.to_string()))?;
        let response = ensure_success(response)?;

        let todos: Vec<FeedTodo> = response
            .json()
            .await
            .map_err(|e| FeedError::Decode(e.to_string()))?;

        tracing::debug!(count = todos.len(), limit, "fetched public feed");
        // The feed may ignore `_limit`.
        Ok(todos.into_iter().take(limit).map(Todo::from).collect())
    }

    async fn put(&self, id: u32, patch: &TodoPatch) -> Result<(), FeedError> {
        let response = self
            .client
            .put(self.todo_url(id))
            .json(patch)
            .send()
            .await
            .map_err(|e| FeedError::Request(e.to_string()))?;
        ensure_success(response)?;
        tracing::debug!(id, "simulated feed update accepted");
        Ok(())
    }

    async fn remove(&self, id: u32) -> Result<(), FeedError> {
        let response = self
            .client
            .delete(self.todo_url(id))
            .send()
            .await
            .map_err(|e| FeedError::Request(e.to_string()))?;
        ensure_success(response)?;
        tracing::debug!(id, "simulated feed delete accepted");
        Ok(())
    }
}

impl Default for JsonPlaceholderClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn ensure_success(response: Response) -> Result<Response, FeedError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(FeedError::Status {
            status: status.as_u16(),
        })
    }
}

impl TodoFeed for JsonPlaceholderClient {
    fn fetch_todos(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Todo>, FeedError>> {
        Box::pin(self.fetch(limit))
    }

    fn update<'a>(&'a self, id: u32, patch: &'a TodoPatch) -> BoxFuture<'a, Result<(), FeedError>> {
        Box::pin(self.put(id, patch))
    }

    fn delete(&self, id: u32) -> BoxFuture<'_, Result<(), FeedError>> {
        Box::pin(self.remove(id))
    }
}
