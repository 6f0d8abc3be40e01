//! Google sign-in through the browser with a loopback redirect.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use breezy_core::GoogleConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex};
use warp::Filter;

use crate::error::AuthError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

// Identity scopes only; the ID token is all the backend needs
const SIGN_IN_SCOPES: &str = "openid email profile";

/// Upper bound on how long we wait for the browser to come back.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<(String, String)>>>>;

pub struct GoogleOAuth {
    client_id: String,
    client_secret: String,
    port: u16,
    token_url: String,
}

impl GoogleOAuth {
    pub fn new(client_id: String, client_secret: String, port: u16) -> Self {
        Self {
            client_id,
            client_secret,
            port,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// `None` while the config still holds placeholder credentials.
    pub fn from_config(config: &GoogleConfig) -> Option<Self> {
        config.is_configured().then(|| {
            Self::new(
                config.client_id.clone(),
                config.client_secret.clone(),
                config.callback_port,
            )
        })
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.port)
    }

    /// Generate authorization URL for OAuth flow.
    /// Returns (url, state) where state should be verified on callback.
    pub fn authorization_url(&self) -> (String, String) {
        let state = uuid::Uuid::new_v4().to_string();

        let url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&prompt=select_account",
            GOOGLE_AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode(SIGN_IN_SCOPES),
            urlencoding::encode(&state),
        );

        (url, state)
    }

    /// Exchange authorization code for tokens.
    #[tracing::instrument(skip(self, code), level = "info")]
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleTokenResponse, AuthError> {
        let redirect_uri = self.redirect_uri();
        let client = reqwest::Client::new();

        let response = client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AuthError::OAuth(format!("Token exchange failed: {}", error_text)));
        }

        response
            .json::<GoogleTokenResponse>()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    /// Run the browser flow and return Google's ID token.
    pub async fn authenticate(&self) -> Result<String, AuthError> {
        let (auth_url, expected_state) = self.authorization_url();

        tracing::info!("Opening browser for Google sign-in...");
        tracing::debug!("Auth URL: {}", auth_url);

        let (tx, rx) = oneshot::channel();
        let tx: CallbackSender = Arc::new(Mutex::new(Some(tx)));

        let routes = warp::get()
            .and(warp::path("callback"))
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::any().map(move || tx.clone()))
            .and_then(|params: HashMap<String, String>, tx: CallbackSender| async move {
                let code = params.get("code").cloned().unwrap_or_default();
                let state = params.get("state").cloned().unwrap_or_default();

                if let Some(sender) = tx.lock().await.take() {
                    let _ = sender.send((code, state));
                }

                Ok::<_, warp::Rejection>(warp::reply::html(
                    "<html><body><h1>Signed in</h1><p>You can close this window and return to Breezy.</p></body></html>",
                ))
            });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (_, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(([127, 0, 0, 1], self.port), async {
                let _ = shutdown_rx.await;
            })
            .map_err(|e| AuthError::OAuth(format!("Failed to bind callback port {}: {}", self.port, e)))?;
        tokio::spawn(server);

        if let Err(e) = webbrowser::open(&auth_url) {
            tracing::warn!("Failed to open browser ({}); open this URL manually: {}", e, auth_url);
        }

        let received = tokio::time::timeout(CALLBACK_TIMEOUT, rx).await;
        let _ = shutdown_tx.send(());

        let (code, state) = received
            .map_err(|_| AuthError::OAuth("Timed out waiting for the browser".into()))?
            .map_err(|_| AuthError::OAuth("Callback server stopped".into()))?;

        if state != expected_state {
            return Err(AuthError::OAuth("CSRF token mismatch".into()));
        }
        if code.is_empty() {
            return Err(AuthError::OAuth("Sign-in was cancelled".into()));
        }

        let tokens = self.exchange_code(&code).await?;
        tokens
            .id_token
            .ok_or_else(|| AuthError::OAuth("Google did not return an ID token".into()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider() -> GoogleOAuth {
        GoogleOAuth::new("test_client_id".to_string(), "test_client_secret".to_string(), 8085)
    }

    #[test]
    fn test_auth_url_requests_identity_scopes() {
        let (url, _state) = provider().authorization_url();
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8085%2Fcallback"));
        assert!(!url.contains("gmail"));
    }

    #[test]
    fn test_state_is_unique() {
        let (_, state1) = provider().authorization_url();
        let (_, state2) = provider().authorization_url();
        assert_ne!(state1, state2);
    }

    #[test]
    fn test_placeholder_config_disables_google() {
        assert!(GoogleOAuth::from_config(&GoogleConfig::default()).is_none());
    }

    #[tokio::test]
    async fn test_exchange_code_returns_id_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at", "id_token": "google-id-token",
                "expires_in": 3599, "token_type": "Bearer", "scope": "openid email profile"
            })))
            .mount(&mock_server)
            .await;

        let provider = provider().with_token_url(format!("{}/token", mock_server.uri()));
        let tokens = provider.exchange_code("abc").await.unwrap();
        assert_eq!(tokens.id_token.as_deref(), Some("google-id-token"));
    }

    #[tokio::test]
    async fn test_exchange_code_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&mock_server)
            .await;

        let provider = provider().with_token_url(format!("{}/token", mock_server.uri()));
        let err = provider.exchange_code("bad").await.unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }
}
