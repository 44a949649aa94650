//! Account client: login, signup, and the signed-in user.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{parse_api_error, AUTH_HEADER};
use crate::config::{normalize_base_url, ClientConfig};
use crate::session::{AuthToken, Session, SessionError, TokenStore};
use crate::util::normalize_text_option;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Signup failed")]
    SignupFailed,
    #[error("{0}")]
    Validation(&'static str),
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Session expired or invalid; sign in again")]
    Unauthorized,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error(transparent)]
    Session(SessionError),
}

impl From<SessionError> for AuthError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::NotSignedIn => Self::NotAuthenticated,
            other => Self::Session(other),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone)]
pub struct AuthClient<S: TokenStore> {
    base_url: String,
    client: Client,
    session: Session<S>,
}

impl<S: TokenStore> AuthClient<S> {
    pub fn new(config: &ClientConfig, session: Session<S>) -> AuthResult<Self> {
        let base_url = normalize_base_url(&config.api_base_url)
            .map_err(|error| AuthError::InvalidConfiguration(error.to_string()))?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            base_url,
            client,
            session,
        })
    }

    pub const fn session(&self) -> &Session<S> {
        &self.session
    }

    /// Exchange credentials for a token and store it.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<AuthToken> {
        let email = required(email, "Email is required")?;
        let password = required(password, "Password is required")?;

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        let token = self
            .request_token("login", &payload)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        self.session.sign_in(&token)?;
        tracing::info!("Signed in as {}", email);
        Ok(token)
    }

    /// Create an account and store its token.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> AuthResult<AuthToken> {
        let name = required(name, "Name is required")?;
        let email = required(email, "Email is required")?;
        let password = required(password, "Password is required")?;

        let payload = serde_json::json!({
            "name": name,
            "email": email,
            "password": password,
        });
        let token = self
            .request_token("createuser", &payload)
            .await?
            .ok_or(AuthError::SignupFailed)?;

        self.session.sign_in(&token)?;
        tracing::info!("Created account for {}", email);
        Ok(token)
    }

    /// Profile of the signed-in user.
    pub async fn current_user(&self) -> AuthResult<User> {
        let token = self.session.require_token()?;
        let response = self
            .client
            .post(format!("{}/api/auth/getuser", self.base_url))
            .header(AUTH_HEADER, token.expose())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::Unauthorized);
        }
        if !status.is_success() {
            return Err(AuthError::Api(format!(
                "{} ({})",
                parse_api_error(status, &body),
                status.as_u16()
            )));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Forget the stored token. The backend keeps no session state.
    pub fn logout(&self) -> AuthResult<()> {
        self.session.sign_out()?;
        Ok(())
    }

    /// POST credentials and pull `authtoken` out of the reply.
    ///
    /// Rejections and replies without a token yield `Ok(None)` after the
    /// cause is logged; only transport failures are returned as errors.
    async fn request_token(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> AuthResult<Option<AuthToken>> {
        let response = self
            .client
            .post(format!("{}/api/auth/{endpoint}", self.base_url))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(
                "Auth request {} rejected: {} ({})",
                endpoint,
                parse_api_error(status, &body),
                status.as_u16()
            );
            return Ok(None);
        }

        let token = serde_json::from_str::<TokenResponse>(&body)
            .ok()
            .and_then(|reply| normalize_text_option(reply.authtoken))
            .and_then(|raw| AuthToken::new(raw).ok());
        if token.is_none() {
            tracing::warn!("Auth request {} returned no token", endpoint);
        }
        Ok(token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    authtoken: Option<String>,
}

fn required<'a>(value: &'a str, message: &'static str) -> AuthResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::Validation(message));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::session::MemoryTokenStore;

    fn client(server: &MockServer, store: MemoryTokenStore) -> AuthClient<MemoryTokenStore> {
        let config = ClientConfig {
            api_base_url: server.base_url(),
            ..ClientConfig::default()
        };
        AuthClient::new(&config, Session::new(store)).unwrap()
    }

    #[tokio::test]
    async fn login_stores_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/login")
                    .json_body(json!({"email": "ada@example.com", "password": "pw"}));
                then.status(200)
                    .json_body(json!({"success": true, "authtoken": "jwt-abc"}));
            })
            .await;

        let store = MemoryTokenStore::new();
        let auth = client(&server, store.clone());
        let token = auth.login(" ada@example.com ", "pw").await.unwrap();

        mock.assert_async().await;
        assert_eq!(token.expose(), "jwt-abc");
        assert_eq!(
            store.load_token().unwrap().as_ref().map(AuthToken::expose),
            Some("jwt-abc")
        );
    }

    #[tokio::test]
    async fn login_without_token_is_invalid_credentials() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/login");
                then.status(200).json_body(json!({"success": false}));
            })
            .await;

        let store = MemoryTokenStore::new();
        let error = client(&server, store.clone())
            .login("ada@example.com", "pw")
            .await
            .unwrap_err();

        assert!(matches!(error, AuthError::InvalidCredentials));
        assert!(store.load_token().unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_signup_is_reported_generically() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/createuser");
                then.status(400)
                    .json_body(json!({"error": "Sorry a user with this email already exists"}));
            })
            .await;

        let error = client(&server, MemoryTokenStore::new())
            .signup("Ada", "ada@example.com", "secret")
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Signup failed");
    }

    #[tokio::test]
    async fn empty_fields_fail_before_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/login");
                then.status(200).json_body(json!({"authtoken": "x"}));
            })
            .await;

        let error = client(&server, MemoryTokenStore::new())
            .login("", "pw")
            .await
            .unwrap_err();

        assert!(matches!(error, AuthError::Validation(_)));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn current_user_uses_stored_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/getuser")
                    .header(AUTH_HEADER, "jwt-abc");
                then.status(200).json_body(json!({
                    "_id": "u1",
                    "name": "Ada",
                    "email": "ada@example.com",
                    "date": "2024-05-01T10:00:00.000Z"
                }));
            })
            .await;

        let store = MemoryTokenStore::with_token("jwt-abc").unwrap();
        let user = client(&server, store).current_user().await.unwrap();
        assert_eq!(user.name, "Ada");
        assert!(user.date.is_some());
    }

    #[tokio::test]
    async fn current_user_requires_session() {
        let server = MockServer::start_async().await;
        let error = client(&server, MemoryTokenStore::new())
            .current_user()
            .await
            .unwrap_err();
        assert!(matches!(error, AuthError::NotAuthenticated));
    }

    #[test]
    fn logout_clears_local_token_only() {
        let store = MemoryTokenStore::with_token("jwt-abc").unwrap();
        let config = ClientConfig::default();
        let auth = AuthClient::new(&config, Session::new(store.clone())).unwrap();

        auth.logout().unwrap();
        assert!(!auth.session().is_authenticated());
        assert!(store.load_token().unwrap().is_none());
    }
}
