use breezy_core::Config;

use crate::error::{AuthError, ProviderErrorKind};
use crate::firebase::IdentityClient;
use crate::google::GoogleOAuth;
use crate::session::{Session, SessionStore};

/// Sign-in, sign-out and session upkeep.
pub struct AuthManager {
    identity: IdentityClient,
    google: Option<GoogleOAuth>,
    store: SessionStore,
}

impl AuthManager {
    pub fn new(identity: IdentityClient, store: SessionStore) -> Self {
        Self {
            identity,
            google: None,
            store,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            identity: IdentityClient::from_config(&config.firebase),
            google: GoogleOAuth::from_config(&config.google),
            store: SessionStore::new(&config.config_dir),
        }
    }

    pub fn with_google(mut self, google: GoogleOAuth) -> Self {
        self.google = Some(google);
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn remember(&self, session: Session) -> Result<Session, AuthError> {
        self.store.save(&session)?;
        Ok(session)
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.identity.sign_up(email.trim(), password).await?;
        tracing::info!("Registered {}", session.email);
        self.remember(session)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.identity.sign_in_with_password(email.trim(), password).await?;
        tracing::info!("Signed in {}", session.email);
        self.remember(session)
    }

    pub async fn sign_in_with_google(&self) -> Result<Session, AuthError> {
        let google = self.google.as_ref().ok_or(AuthError::GoogleNotConfigured)?;
        let id_token = google.authenticate().await?;
        let session = self
            .identity
            .sign_in_with_google(&id_token, &google.redirect_uri())
            .await?;
        tracing::info!("Signed in {} with Google", session.email);
        self.remember(session)
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.identity.send_password_reset(email.trim()).await
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.clear()?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// The stored session with a usable ID token, refreshing it when it is
    /// within five minutes of expiry. A refresh token the provider rejects
    /// signs the user out.
    pub async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.store.load()? else {
            return Ok(None);
        };

        if !session.needs_refresh() {
            return Ok(Some(session));
        }

        tracing::debug!("Refreshing ID token for {}", session.email);
        match self.identity.refresh(&session.refresh_token).await {
            Ok(token) => {
                let refreshed = IdentityClient::apply_refresh(&session, token);
                self.remember(refreshed).map(Some)
            }
            Err(err @ AuthError::Provider { .. }) => {
                tracing::warn!("Refresh rejected ({}); signing out", err);
                self.store.clear()?;
                if err.kind() == Some(ProviderErrorKind::UserDisabled) {
                    return Err(err);
                }
                Err(AuthError::SessionExpired)
            }
            Err(err) => Err(err),
        }
    }

    /// Like [`current_session`](Self::current_session) but fails when signed out.
    pub async fn require_session(&self) -> Result<Session, AuthError> {
        self.current_session().await?.ok_or(AuthError::NotSignedIn)
    }
}
