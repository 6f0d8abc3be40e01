//! Identity provider REST client (email/password, IdP sign-in, token refresh).

use std::sync::Arc;

use breezy_core::FirebaseConfig;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::error::AuthError;
use crate::session::{Session, SignInMethod};

const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Account payload returned by sign-up and the sign-in endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

/// Secure-token refresh response (snake_case, unlike the rest of the API).
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedToken {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

fn expires_at(expires_in: Option<&str>) -> i64 {
    let secs = expires_in
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    chrono::Utc::now().timestamp() + secs
}

impl AccountResponse {
    fn into_session(self, method: SignInMethod) -> Session {
        Session {
            expires_at: expires_at(self.expires_in.as_deref()),
            uid: self.local_id,
            email: self.email,
            display_name: self.display_name.filter(|n| !n.is_empty()),
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            method,
        }
    }
}

/// Client for the `accounts:*` and secure-token endpoints
#[derive(Debug, Clone)]
pub struct IdentityClient {
    client: Arc<Client>,
    identity_url: String,
    secure_token_url: String,
    api_key: String,
}

impl IdentityClient {
    pub fn new(
        identity_url: impl Into<String>,
        secure_token_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: Arc::new(Client::new()),
            identity_url: identity_url.into().trim_end_matches('/').to_string(),
            secure_token_url: secure_token_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &FirebaseConfig) -> Self {
        Self::new(&config.identity_url, &config.secure_token_url, &config.api_key)
    }

    fn accounts_url(&self, action: &str) -> String {
        format!("{}/accounts:{}", self.identity_url, action)
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("Identity request failed with status {}", status));
            tracing::warn!("Identity request failed ({}): {}", status, message);
            return Err(AuthError::provider(message));
        }

        serde_json::from_str(&body).map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    async fn post_accounts<T: DeserializeOwned>(
        &self,
        action: &str,
        body: &impl Serialize,
    ) -> Result<T, AuthError> {
        let response = self
            .client
            .post(self.accounts_url(action))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }

    /// Create an email/password account and sign it in.
    #[instrument(skip(self, password), level = "info")]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let account: AccountResponse = self
            .post_accounts(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(account.into_session(SignInMethod::Password))
    }

    #[instrument(skip(self, password), level = "info")]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let account: AccountResponse = self
            .post_accounts(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(account.into_session(SignInMethod::Password))
    }

    /// Exchange a Google ID token for a session.
    #[instrument(skip(self, google_id_token), level = "info")]
    pub async fn sign_in_with_google(
        &self,
        google_id_token: &str,
        request_uri: &str,
    ) -> Result<Session, AuthError> {
        let post_body = format!(
            "id_token={}&providerId=google.com",
            urlencoding::encode(google_id_token)
        );
        let account: AccountResponse = self
            .post_accounts(
                "signInWithIdp",
                &json!({
                    "postBody": post_body,
                    "requestUri": request_uri,
                    "returnSecureToken": true,
                    "returnIdpCredential": true,
                }),
            )
            .await?;
        Ok(account.into_session(SignInMethod::Google))
    }

    #[instrument(skip(self), level = "info")]
    pub async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let _: serde_json::Value = self
            .post_accounts(
                "sendOobCode",
                &json!({ "requestType": "PASSWORD_RESET", "email": email }),
            )
            .await?;
        tracing::info!("Password reset email requested for {}", email);
        Ok(())
    }

    /// Trade a refresh token for a new ID token.
    #[instrument(skip(self, refresh_token), level = "debug")]
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, AuthError> {
        let response = self
            .client
            .post(format!("{}/token", self.secure_token_url))
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        Self::read(response).await
    }

    /// Apply a refresh result to an existing session.
    pub fn apply_refresh(session: &Session, token: RefreshedToken) -> Session {
        Session {
            id_token: token.id_token,
            refresh_token: token.refresh_token,
            expires_at: expires_at(Some(&token.expires_in)),
            ..session.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_accounts_url() {
        let client = IdentityClient::new("https://id.example.com/v1/", "https://st.example.com/v1", "k");
        assert_eq!(client.accounts_url("signUp"), "https://id.example.com/v1/accounts:signUp");
    }

    #[test]
    fn test_account_into_session() {
        let account: AccountResponse = serde_json::from_value(json!({
            "localId": "u1", "email": "a@b.c", "displayName": "",
            "idToken": "t", "refreshToken": "r", "expiresIn": "3600"
        }))
        .unwrap();
        let before = chrono::Utc::now().timestamp();
        let session = account.into_session(SignInMethod::Password);

        assert_eq!(session.uid, "u1");
        assert!(session.display_name.is_none());
        assert!(session.expires_at >= before + 3600);
        assert!(!session.needs_refresh());
    }

    #[test]
    fn test_unparseable_expiry_defaults_to_an_hour() {
        let now = chrono::Utc::now().timestamp();
        let at = expires_at(Some("soon"));
        assert!(at >= now + DEFAULT_EXPIRES_IN_SECS);
    }
}
