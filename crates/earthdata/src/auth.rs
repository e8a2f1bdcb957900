//! Earthdata Login credentials and bearer-token sessions.

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::{CatalogError, CatalogResult};

pub const DEFAULT_URS_URL: &str = "https://urs.earthdata.nasa.gov";

/// Credentials for Earthdata Login.
#[derive(Clone)]
pub enum EarthdataCredentials {
    /// A pre-issued user token.
    Token(String),
    /// Username and password, exchanged for a token at login.
    Login { username: String, password: String },
}

impl std::fmt::Debug for EarthdataCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expiration_date: Option<String>,
}

/// An authenticated (or anonymous) Earthdata session.
#[derive(Clone, Default)]
pub struct EarthdataSession {
    token: Option<String>,
}

impl std::fmt::Debug for EarthdataSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EarthdataSession")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl EarthdataSession {
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Attach the bearer token to a request, if there is one.
    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Establish a session from credentials.
    #[instrument(skip(client, credentials))]
    pub async fn login(
        client: &Client,
        urs_url: &str,
        credentials: &EarthdataCredentials,
    ) -> CatalogResult<Self> {
        match credentials {
            EarthdataCredentials::Token(token) => Ok(Self::with_token(token.clone())),
            EarthdataCredentials::Login { username, password } => {
                let url = format!(
                    "{}/api/users/find_or_create_token",
                    urs_url.trim_end_matches('/')
                );
                let response = client
                    .post(&url)
                    .basic_auth(username, Some(password))
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(CatalogError::Auth(format!(
                        "token endpoint returned {}",
                        status
                    )));
                }

                let body: TokenResponse = response
                    .json()
                    .await
                    .map_err(|e| CatalogError::Auth(format!("invalid token response: {}", e)))?;

                info!(
                    username = %username,
                    expires = ?body.expiration_date,
                    "Authenticated with Earthdata Login"
                );
                Ok(Self::with_token(body.access_token))
            }
        }
    }

    /// Like [`login`](Self::login), but falls back to an anonymous session.
    pub async fn login_or_anonymous(
        client: &Client,
        urs_url: &str,
        credentials: Option<&EarthdataCredentials>,
    ) -> Self {
        let Some(credentials) = credentials else {
            warn!("No Earthdata credentials configured, granule downloads will likely fail");
            return Self::anonymous();
        };
        match Self::login(client, urs_url, credentials).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Earthdata authentication failed");
                Self::anonymous()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_secrets() {
        let creds = EarthdataCredentials::Login {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("alice"));
        assert!(!printed.contains("hunter2"));

        let token = EarthdataCredentials::Token("secret-token".to_string());
        assert!(!format!("{:?}", token).contains("secret-token"));

        let session = EarthdataSession::with_token("secret-token");
        assert!(!format!("{:?}", session).contains("secret-token"));
    }

    #[tokio::test]
    async fn test_token_credentials_need_no_network() {
        let client = Client::new();
        let session = EarthdataSession::login(
            &client,
            DEFAULT_URS_URL,
            &EarthdataCredentials::Token("abc".to_string()),
        )
        .await
        .unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some("abc"));
    }

    #[tokio::test]
    async fn test_missing_credentials_are_anonymous() {
        let client = Client::new();
        let session = EarthdataSession::login_or_anonymous(&client, DEFAULT_URS_URL, None).await;
        assert!(!session.is_authenticated());
    }
}
