//! Accounts for Breezy: email/password and Google sign-in against the
//! identity provider, with the session kept in the config directory.

pub mod error;
pub mod firebase;
pub mod google;
pub mod manager;
pub mod session;

pub use error::{AuthError, ProviderErrorKind};
pub use firebase::IdentityClient;
pub use google::GoogleOAuth;
pub use manager::AuthManager;
pub use session::{Session, SessionStore, SignInMethod};
