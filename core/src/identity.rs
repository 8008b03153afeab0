//! The current principal and its one-time resolution.
//!
//! Identity providers report the signed-in user asynchronously: right after
//! start-up there is a window in which no session has been restored yet, and
//! a naive read would observe "signed out" even though a session is about to
//! appear. [`AuthSession`] makes that window explicit. It starts *pending*;
//! the provider's first report resolves it, and every consumer awaits
//! [`AuthSession::current`] instead of sampling a snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Identifier of an authenticated user.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The currently authenticated user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User id issued by the identity provider
    pub uid: UserId,
    /// Email address, if the provider knows one
    pub email: Option<String>,
    /// Bearer token for the Remote Document Store
    pub id_token: Option<String>,
    /// Token used to mint a new `id_token`
    pub refresh_token: Option<String>,
}

impl Principal {
    /// Creates a principal without credentials.
    #[must_use]
    pub const fn new(uid: UserId) -> Self {
        Self {
            uid,
            email: None,
            id_token: None,
            refresh_token: None,
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone, Debug)]
enum Resolution {
    Pending,
    Resolved(Option<Principal>),
}

/// Shared handle to the authentication state.
///
/// Cloning is cheap; all clones observe the same state.
///
/// # Example
///
/// ```
/// use horizon_todo_core::identity::{AuthSession, Principal, UserId};
///
/// # tokio_test::block_on(async {
/// let session = AuthSession::new();
/// assert!(!session.is_resolved());
///
/// session.publish(Some(Principal::new(UserId::new("u1"))));
/// let principal = session.current().await;
/// assert_eq!(principal.map(|p| p.uid), Some(UserId::new("u1")));
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct AuthSession {
    state: Arc<watch::Sender<Resolution>>,
}

impl AuthSession {
    /// Creates a session that has not heard from the provider yet.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(Resolution::Pending);
        Self {
            state: Arc::new(state),
        }
    }

    /// Creates a session that is already resolved.
    #[must_use]
    pub fn resolved(principal: Option<Principal>) -> Self {
        let (state, _) = watch::channel(Resolution::Resolved(principal));
        Self {
            state: Arc::new(state),
        }
    }

    /// Reports the provider's current principal.
    ///
    /// The first call resolves the session; later calls record sign-in and
    /// sign-out.
    pub fn publish(&self, principal: Option<Principal>) {
        self.state.send_replace(Resolution::Resolved(principal));
    }

    /// Returns `true` once the provider has reported at least once.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.borrow(), Resolution::Resolved(_))
    }

    /// Reads the principal without waiting.
    ///
    /// Returns `None` both when signed out and while still pending; use
    /// [`current`](Self::current) to decide access.
    #[must_use]
    pub fn snapshot(&self) -> Option<Principal> {
        match &*self.state.borrow() {
            Resolution::Resolved(principal) => principal.clone(),
            Resolution::Pending => None,
        }
    }

    /// Waits for the first resolution, then returns the current principal.
    pub async fn current(&self) -> Option<Principal> {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let Ok(resolution) = rx
            .wait_for(|r| matches!(r, Resolution::Resolved(_)))
            .await
        else {
            return None;
        };
        match &*resolution {
            Resolution::Resolved(principal) => principal.clone(),
            Resolution::Pending => None,
        }
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}
