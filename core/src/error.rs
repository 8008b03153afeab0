//! Error types for the document store, the public feed, identity and the aggregator.
//!
//! Display strings double as the human-readable messages the aggregator
//! publishes to its `error` field.

use thiserror::Error;

/// Errors from the Remote Document Store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The request never produced a response (network, TLS, timeout).
    #[error("Document store request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status.
    #[error("Document store error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error body returned by the store
        message: String,
    },

    /// The store rejected the principal's id token.
    #[error("Session is no longer valid, sign in again: {0}")]
    Unauthenticated(String),

    /// The document addressed by id does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A response or document could not be decoded.
    #[error("Failed to decode document: {0}")]
    Decode(String),
}

/// Errors from the Public Todo Feed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The request never produced a response.
    #[error("Public feed request failed: {0}")]
    Request(String),

    /// The feed answered with a non-success status.
    #[error("Failed to reach the public todo feed (status {status})")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The feed body was not the expected JSON.
    #[error("Failed to decode public feed response: {0}")]
    Decode(String),
}

/// Errors from the identity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Wrong email or password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Sign-up with an email that is already registered.
    #[error("An account with this email already exists")]
    EmailExists,

    /// The refresh token was revoked, expired or belongs to a removed user.
    #[error("Session expired, sign in again")]
    SessionExpired,

    /// Password rejected by the provider's policy.
    #[error("Password is too weak: {0}")]
    WeakPassword(String),

    /// The request never produced a response.
    #[error("Authentication request failed: {0}")]
    Request(String),

    /// The provider answered with an unexpected error.
    #[error("Authentication error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Provider error code or body
        message: String,
    },

    /// The provider's response could not be decoded.
    #[error("Failed to decode authentication response: {0}")]
    Decode(String),
}

/// Errors surfaced by aggregator operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// A mutation that needs a principal was attempted while signed out.
    #[error("You must be signed in to add todos")]
    Unauthenticated,

    /// Input rejected before any write.
    #[error("Invalid todo: {0}")]
    Validation(String),

    /// Remote Document Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Public Todo Feed failure.
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// Identity provider failure.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Result type alias for aggregator operations.
pub type Result<T> = std::result::Result<T, TodoError>;
