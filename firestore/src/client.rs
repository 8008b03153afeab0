//! Firestore REST client implementing [`DocumentStore`].

use crate::auth::FirebaseAuth;
use crate::value::{Document, Fields, Value, encode_new_todo, encode_patch, field};
use horizon_todo_core::environment::{BoxFuture, DocumentStore, Query, SortDirection};
use horizon_todo_core::error::StoreError;
use horizon_todo_core::identity::AuthSession;
use horizon_todo_core::todo::{NewTodo, Todo, TodoPatch};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Production Firestore endpoint.
pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";

/// Firestore client
///
/// Requests carry the current principal's id token (if any) as a bearer
/// token and the project's web API key (if configured) as `key`. With a
/// token refresher attached, a `401` triggers one refresh and one retry.
#[derive(Clone, Debug)]
pub struct FirestoreClient {
    client: Client,
    base_url: String,
    project_id: String,
    api_key: Option<String>,
    session: AuthSession,
    refresher: Option<FirebaseAuth>,
}

#[derive(Serialize)]
struct DocumentBody<'a> {
    fields: &'a Fields,
}

/// One entry of a `runQuery` response stream.
#[derive(Deserialize)]
struct QueryResult {
    document: Option<Document>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirestoreClient {
    /// Create a client for `project_id` against the production endpoint.
    #[must_use]
    pub fn new(project_id: impl Into<String>, session: AuthSession) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id: project_id.into(),
            api_key: None,
            session,
            refresher: None,
        }
    }

    /// Points the client at another endpoint (emulator, test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sends `key=<api_key>` with every request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Refreshes expired id tokens through `auth` before giving up on a `401`.
    #[must_use]
    pub fn with_token_refresh(mut self, auth: FirebaseAuth) -> Self {
        self.refresher = Some(auth);
        self
    }

    /// Applies a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Request` if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, StoreError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Ok(self)
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            self.base_url, self.project_id
        )
    }

    /// Appends `segments` to the documents root, percent-encoding each one.
    fn documents_url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url =
            Url::parse(&self.documents_root()).map_err(|e| StoreError::Request(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| StoreError::Request(format!("{} is not a base URL", self.base_url)))?
            .extend(segments);
        Ok(url)
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, StoreError> {
        self.documents_url(&[collection, document_id(id)?])
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        };
        match self.session.snapshot().and_then(|p| p.id_token) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn dispatch(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        // Cloned before authorizing so a retry picks up the refreshed token.
        let retry = request.try_clone();
        let response = self.dispatch(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let (Some(auth), Some(retry)) = (&self.refresher, retry) else {
            return Ok(response);
        };

        match auth.refresh().await {
            Ok(_) => {
                tracing::debug!("retrying with refreshed id token");
                self.dispatch(retry).await
            }
            Err(error) => {
                tracing::warn!(%error, "id token refresh failed");
                Ok(response)
            }
        }
    }

    async fn run_query(&self, query: &Query) -> Result<Vec<Todo>, StoreError> {
        let direction = match query.order_by.direction {
            SortDirection::Ascending => "ASCENDING",
            SortDirection::Descending => "DESCENDING",
        };
        let mut structured = json!({
            "from": [{ "collectionId": query.collection }],
            "orderBy": [{
                "field": { "fieldPath": query.order_by.field },
                "direction": direction,
            }],
        });
        if let Some(owner) = &query.owner {
            structured["where"] = json!({
                "fieldFilter": {
                    "field": { "fieldPath": field::USER_ID },
                    "op": "EQUAL",
                    "value": Value::string(owner.as_str()),
                }
            });
        }

        let url = format!("{}:runQuery", self.documents_root());
        let response = self
            .send(self.client.post(url).json(&json!({ "structuredQuery": structured })))
            .await?;
        let response = ensure_success(response, &query.collection).await?;

        let results: Vec<QueryResult> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        // Entries without a document only report progress (`readTime`).
        let todos = results
            .into_iter()
            .filter_map(|result| result.document)
            .map(Document::into_todo)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            collection = %query.collection,
            count = todos.len(),
            "queried document store"
        );
        Ok(todos)
    }

    async fn create_document(&self, collection: &str, todo: &NewTodo) -> Result<String, StoreError> {
        let fields = encode_new_todo(todo);
        let url = self.documents_url(&[collection])?;
        let response = self
            .send(self.client.post(url).json(&DocumentBody { fields: &fields }))
            .await?;
        let response = ensure_success(response, collection).await?;

        let document: Document = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let id = document
            .id()
            .ok_or_else(|| StoreError::Decode("created document has no name".to_string()))?
            .to_string();

        tracing::debug!(collection, id = %id, "created document");
        Ok(id)
    }

    async fn patch_document(
        &self,
        collection: &str,
        id: &str,
        patch: &TodoPatch,
    ) -> Result<(), StoreError> {
        let fields = encode_patch(patch);
        let mut params: Vec<(&str, &str)> = patch
            .field_paths()
            .into_iter()
            .map(|path| ("updateMask.fieldPaths", path))
            .collect();
        // Without this precondition a PATCH would upsert a missing document.
        params.push(("currentDocument.exists", "true"));

        let request = self
            .client
            .patch(self.document_url(collection, id)?)
            .query(&params)
            .json(&DocumentBody { fields: &fields });
        let response = self.send(request).await?;
        ensure_success(response, id).await?;

        tracing::debug!(collection, id, "updated document");
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let response = self
            .send(self.client.delete(self.document_url(collection, id)?))
            .await?;
        ensure_success(response, id).await?;

        tracing::debug!(collection, id, "deleted document");
        Ok(())
    }
}

/// Rejects ids that cannot name a single document of the collection.
///
/// Such an id is reported as missing without contacting the store.
fn document_id(id: &str) -> Result<&str, StoreError> {
    if id.is_empty() || id == "." || id == ".." || id.contains('/') {
        return Err(StoreError::NotFound(id.to_string()));
    }
    Ok(id)
}

/// Maps non-success responses to [`StoreError`]; 404 names `target`.
async fn ensure_success(response: Response, target: &str) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(StoreError::NotFound(target.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);
    if status == StatusCode::UNAUTHORIZED {
        tracing::warn!(%message, "document store rejected the id token");
        return Err(StoreError::Unauthenticated(message));
    }
    tracing::warn!(status = status.as_u16(), %message, "document store rejected request");
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

impl DocumentStore for FirestoreClient {
    fn query<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Vec<Todo>, StoreError>> {
        Box::pin(self.run_query(query))
    }

    fn create<'a>(
        &'a self,
        collection: &'a str,
        todo: &'a NewTodo,
    ) -> BoxFuture<'a, Result<String, StoreError>> {
        Box::pin(self.create_document(collection, todo))
    }

    fn update_fields<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        patch: &'a TodoPatch,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.patch_document(collection, id, patch))
    }

    fn delete<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.delete_document(collection, id))
    }
}
