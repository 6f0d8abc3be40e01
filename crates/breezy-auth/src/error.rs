use breezy_core::error::AuthError as CoreAuthError;
use breezy_core::{AppError, ReqwestErrorExt};

/// Error codes the identity provider reports in `error.message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    EmailExists,
    EmailNotFound,
    InvalidPassword,
    InvalidCredentials,
    WeakPassword,
    UserDisabled,
    TooManyAttempts,
    TokenExpired,
    Unknown,
}

impl ProviderErrorKind {
    /// Codes may carry a detail suffix, e.g.
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    pub fn from_code(message: &str) -> Self {
        let code = message.split(" : ").next().unwrap_or(message).trim();
        match code {
            "EMAIL_EXISTS" => Self::EmailExists,
            "EMAIL_NOT_FOUND" => Self::EmailNotFound,
            "INVALID_PASSWORD" => Self::InvalidPassword,
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL" => Self::InvalidCredentials,
            "WEAK_PASSWORD" => Self::WeakPassword,
            "USER_DISABLED" => Self::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyAttempts,
            "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => Self::TokenExpired,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Rejected by the identity provider; `message` is the provider's text.
    #[error("{message}")]
    Provider {
        kind: ProviderErrorKind,
        message: String,
    },

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Session expired")]
    SessionExpired,

    #[error("Google sign-in is not configured")]
    GoogleNotConfigured,

    #[error("OAuth flow failed: {0}")]
    OAuth(String),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    pub fn provider(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Provider {
            kind: ProviderErrorKind::from_code(&message),
            message,
        }
    }

    pub fn kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Self::Provider { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Provider { kind, message } => Self::Auth(match kind {
                ProviderErrorKind::EmailExists => CoreAuthError::EmailInUse,
                ProviderErrorKind::EmailNotFound
                | ProviderErrorKind::InvalidPassword
                | ProviderErrorKind::InvalidCredentials => CoreAuthError::InvalidCredentials,
                ProviderErrorKind::WeakPassword => CoreAuthError::WeakPassword(message),
                ProviderErrorKind::UserDisabled => CoreAuthError::AccountDisabled,
                ProviderErrorKind::TooManyAttempts => CoreAuthError::TooManyAttempts,
                ProviderErrorKind::TokenExpired => CoreAuthError::SessionExpired,
                ProviderErrorKind::Unknown => CoreAuthError::Provider(message),
            }),
            AuthError::NotSignedIn => Self::Auth(CoreAuthError::NotSignedIn),
            AuthError::SessionExpired => Self::Auth(CoreAuthError::SessionExpired),
            AuthError::GoogleNotConfigured => {
                Self::Auth(CoreAuthError::OAuthFailed("Google sign-in is not configured".into()))
            }
            AuthError::OAuth(msg) => Self::Auth(CoreAuthError::OAuthFailed(msg)),
            AuthError::Storage(msg) => Self::Auth(CoreAuthError::StorageError(msg)),
            AuthError::Network(e) => Self::Network(e.into_network_error()),
            AuthError::InvalidResponse(msg) => {
                Self::Network(breezy_core::NetworkError::InvalidResponse(msg))
            }
        }
    }
}
