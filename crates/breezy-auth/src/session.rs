use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AuthError;

const SESSION_FILE: &str = "session.json";

/// Seconds before expiry at which the ID token is refreshed.
pub const REFRESH_MARGIN_SECS: i64 = 300;

/// How the user signed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignInMethod {
    Password,
    Google,
}

/// Signed-in user with the tokens needed to call the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Stable user id
    pub uid: String,

    pub email: String,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Bearer token for document store calls
    pub id_token: String,

    pub refresh_token: String,

    /// ID token expiration (Unix timestamp)
    pub expires_at: i64,

    pub method: SignInMethod,
}

impl Session {
    /// Check if the token needs refresh (within 5 minutes of expiry)
    pub fn needs_refresh(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - REFRESH_MARGIN_SECS
    }

    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() >= self.expires_at
    }
}

/// Persists the session as JSON in the config directory
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    pub fn save(&self, session: &Session) -> Result<(), AuthError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| AuthError::Storage(format!("Failed to create {:?}: {}", self.dir, e)))?;

        let json = serde_json::to_string_pretty(session)
            .map_err(|e| AuthError::Storage(format!("Failed to serialize session: {}", e)))?;

        write_private(&self.path(), &json)
            .map_err(|e| AuthError::Storage(format!("Failed to write session file: {}", e)))?;

        tracing::info!("Stored session for {}", session.email);
        Ok(())
    }

    /// Stored session, or `None` when nobody is signed in. A corrupt file is
    /// treated as signed out.
    pub fn load(&self) -> Result<Option<Session>, AuthError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| AuthError::Storage(format!("Failed to read session file: {}", e)))?;

        match serde_json::from_str::<Session>(&json) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| AuthError::Storage(format!("Failed to delete session file: {}", e)))?;
            tracing::info!("Cleared stored session");
        }
        Ok(())
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    fs::write(path, contents)
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    pub(crate) fn session_expiring_in(secs: i64) -> Session {
        Session {
            uid: "uid-1".to_string(),
            email: "ada@example.com".to_string(),
            display_name: None,
            id_token: "id-token".to_string(),
            refresh_token: "refresh-token".to_string(),
            expires_at: chrono::Utc::now().timestamp() + secs,
            method: SignInMethod::Password,
        }
    }

    #[test]
    fn test_token_expiry() {
        let expired = session_expiring_in(-3600);
        assert!(expired.is_expired());
        assert!(expired.needs_refresh());

        let valid = session_expiring_in(3600);
        assert!(!valid.is_expired());
        assert!(!valid.needs_refresh());

        // Needs refresh soon
        let soon = session_expiring_in(200);
        assert!(!soon.is_expired());
        assert!(soon.needs_refresh());
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested"));
        assert!(store.load().unwrap().is_none());

        let session = session_expiring_in(3600);
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_reads_as_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
