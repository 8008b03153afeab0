//! Firebase email/password authentication over the Identity Toolkit REST API.

use horizon_todo_core::environment::{BoxFuture, IdentityProvider};
use horizon_todo_core::error::AuthError;
use horizon_todo_core::identity::{AuthSession, Principal, UserId};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Production Identity Toolkit endpoint.
pub const DEFAULT_AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

/// Production Secure Token endpoint, which exchanges refresh tokens.
pub const DEFAULT_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl From<PasswordResponse> for Principal {
    fn from(response: PasswordResponse) -> Self {
        Self {
            uid: UserId::new(response.local_id),
            email: response.email,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
        }
    }
}

/// Secure Token answers in `snake_case`, unlike Identity Toolkit.
#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Firebase Authentication client
///
/// Publishes every sign-in, sign-up, token refresh and sign-out to its
/// [`AuthSession`].
#[derive(Clone, Debug)]
pub struct FirebaseAuth {
    client: Client,
    base_url: String,
    token_base_url: String,
    api_key: String,
    session: AuthSession,
}

impl FirebaseAuth {
    /// Create a client publishing to `session`.
    #[must_use]
    pub fn new(api_key: impl Into<String>, session: AuthSession) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            token_base_url: DEFAULT_TOKEN_BASE_URL.to_string(),
            api_key: api_key.into(),
            session,
        }
    }

    /// Points the client at another endpoint (emulator, test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Points token refreshes at another endpoint.
    #[must_use]
    pub fn with_token_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.token_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Applies a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Request` if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, AuthError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Request(e.to_string()))?;
        Ok(self)
    }

    async fn password_call(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<Principal, AuthError> {
        let response = self
            .client
            .post(format!("{}/v1/accounts:{action}", self.base_url))
            .query(&[("key", &self.api_key)])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error(status.as_u16(), &body));
        }

        let principal: Principal = response
            .json::<PasswordResponse>()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?
            .into();

        tracing::info!(uid = %principal.uid, action, "authenticated");
        self.session.publish(Some(principal.clone()));
        Ok(principal)
    }

    /// Exchanges the current principal's refresh token for a new id token
    /// and publishes the updated principal.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` when signed out, when no refresh
    /// token is held, or when the provider no longer honours it.
    pub async fn refresh(&self) -> Result<Principal, AuthError> {
        let current = self.session.snapshot().ok_or(AuthError::SessionExpired)?;
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or(AuthError::SessionExpired)?;

        let response = self
            .client
            .post(format!("{}/v1/token", self.token_base_url))
            .query(&[("key", &self.api_key)])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error(status.as_u16(), &body));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        if refreshed.user_id != current.uid.as_str() {
            return Err(AuthError::Decode(format!(
                "refreshed token belongs to {}",
                refreshed.user_id
            )));
        }

        let principal = Principal {
            id_token: Some(refreshed.id_token),
            refresh_token: Some(refreshed.refresh_token),
            ..current
        };
        tracing::info!(uid = %principal.uid, "refreshed id token");
        self.session.publish(Some(principal.clone()));
        Ok(principal)
    }
}

/// Maps Identity Toolkit error codes to [`AuthError`].
///
/// Codes arrive in `error.message`, sometimes followed by ` : <detail>`.
fn map_error(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());
    let (code, detail) = match message.split_once(" : ") {
        Some((code, detail)) => (code.trim(), detail.trim()),
        None => (message.trim(), ""),
    };

    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AuthError::InvalidCredentials
        }
        "EMAIL_EXISTS" => AuthError::EmailExists,
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => AuthError::SessionExpired,
        "WEAK_PASSWORD" => AuthError::WeakPassword(if detail.is_empty() {
            "Password should be at least 6 characters".to_string()
        } else {
            detail.to_string()
        }),
        _ => AuthError::Status {
            status,
            message: message.clone(),
        },
    }
}

impl IdentityProvider for FirebaseAuth {
    fn session(&self) -> AuthSession {
        self.session.clone()
    }

    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Principal, AuthError>> {
        Box::pin(self.password_call("signInWithPassword", email, password))
    }

    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Principal, AuthError>> {
        Box::pin(self.password_call("signUp", email, password))
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        Box::pin(async move {
            // ID tokens are stateless; signing out only forgets them.
            self.session.publish(None);
            tracing::info!("signed out");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn auth(server: &MockServer, session: AuthSession) -> FirebaseAuth {
        FirebaseAuth::new("web-key", session)
            .with_base_url(server.uri())
            .with_token_base_url(server.uri())
    }

    fn stale_principal() -> Principal {
        Principal {
            uid: UserId::new("u1"),
            email: Some("ada@example.com".to_string()),
            id_token: Some("expired-token".to_string()),
            refresh_token: Some("refresh-1".to_string()),
        }
    }

    #[tokio::test]
    async fn sign_in_publishes_principal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .and(query_param("key", "web-key"))
            .and(body_json(json!({
                "email": "ada@example.com",
                "password": "hunter22",
                "returnSecureToken": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localId": "u1",
                "email": "ada@example.com",
                "idToken": "id-token",
                "refreshToken": "refresh-token",
                "expiresIn": "3600",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = AuthSession::new();
        let provider = auth(&server, session.clone());
        let principal = provider.sign_in("ada@example.com", "hunter22").await.unwrap();

        assert_eq!(principal.uid, UserId::new("u1"));
        assert_eq!(principal.id_token.as_deref(), Some("id-token"));
        assert_eq!(session.current().await, Some(principal));
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "INVALID_LOGIN_CREDENTIALS"}
            })))
            .mount(&server)
            .await;

        let session = AuthSession::new();
        let err = auth(&server, session.clone())
            .sign_in("ada@example.com", "nope")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert!(!session.is_resolved());
    }

    #[tokio::test]
    async fn sign_up_maps_duplicate_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "EMAIL_EXISTS"}
            })))
            .mount(&server)
            .await;

        let err = auth(&server, AuthSession::new())
            .sign_up("ada@example.com", "hunter22")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::EmailExists);
    }

    #[test]
    fn weak_password_keeps_provider_detail() {
        let body = json!({"error": {"message": "WEAK_PASSWORD : Password should be at least 6 characters"}});
        assert_eq!(
            map_error(400, &body.to_string()),
            AuthError::WeakPassword("Password should be at least 6 characters".to_string())
        );
    }

    #[test]
    fn unknown_codes_keep_status() {
        assert_eq!(
            map_error(429, "TOO_MANY_ATTEMPTS_TRY_LATER"),
            AuthError::Status {
                status: 429,
                message: "TOO_MANY_ATTEMPTS_TRY_LATER".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let server = MockServer::start().await;
        let session = AuthSession::resolved(Some(Principal::new(UserId::new("u1"))));

        auth(&server, session.clone()).sign_out().await.unwrap();
        assert_eq!(session.current().await, None);
    }

    #[tokio::test]
    async fn refresh_swaps_tokens_and_keeps_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .and(query_param("key", "web-key"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "fresh-token",
                "refresh_token": "refresh-2",
                "user_id": "u1",
                "expires_in": "3600",
                "token_type": "Bearer",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = AuthSession::resolved(Some(stale_principal()));
        let principal = auth(&server, session.clone()).refresh().await.unwrap();

        assert_eq!(principal.id_token.as_deref(), Some("fresh-token"));
        assert_eq!(principal.refresh_token.as_deref(), Some("refresh-2"));
        assert_eq!(principal.email.as_deref(), Some("ada@example.com"));
        assert_eq!(session.snapshot(), Some(principal));
    }

    #[tokio::test]
    async fn revoked_refresh_token_is_session_expired() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "TOKEN_EXPIRED", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let session = AuthSession::resolved(Some(stale_principal()));
        let err = auth(&server, session.clone()).refresh().await.unwrap_err();

        assert_eq!(err, AuthError::SessionExpired);
        assert_eq!(session.snapshot(), Some(stale_principal()));
    }

    #[tokio::test]
    async fn refresh_needs_a_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let session = AuthSession::resolved(Some(Principal::new(UserId::new("u1"))));
        let err = auth(&server, session).refresh().await.unwrap_err();
        assert_eq!(err, AuthError::SessionExpired);
    }
}
