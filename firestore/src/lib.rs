//! Firebase backends for Horizon Todo.
//!
//! - [`FirestoreClient`]: the Remote Document Store, over the Cloud Firestore
//!   REST API
//! - [`FirebaseAuth`]: email/password identity over the Identity Toolkit REST
//!   API
//!
//! Both share one [`AuthSession`](horizon_todo_core::identity::AuthSession):
//! the auth client publishes the principal, the store client reads its id
//! token for every request. A store client built with
//! [`FirestoreClient::with_token_refresh`] asks the auth client for a new id
//! token when the store answers `401`.
//!
//! # Example
//!
//! ```no_run
//! use horizon_todo_core::identity::AuthSession;
//! use horizon_todo_firestore::{FirebaseAuth, FirestoreClient};
//!
//! let session = AuthSession::new();
//! let auth = FirebaseAuth::new("web-api-key", session.clone());
//! let store = FirestoreClient::new("my-project", session)
//!     .with_api_key("web-api-key")
//!     .with_token_refresh(auth);
//! ```

pub mod auth;
pub mod client;
pub mod value;

pub use auth::{DEFAULT_AUTH_BASE_URL, DEFAULT_TOKEN_BASE_URL, FirebaseAuth};
pub use client::{DEFAULT_BASE_URL, FirestoreClient};
