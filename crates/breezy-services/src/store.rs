//! Per-user data storage: favorites, settings, phone verification and alert
//! subscriptions.

use std::collections::HashMap;
use std::future::Future;

use breezy_auth::Session;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::settings::UserSettings;

/// Identifies the signed-in user and carries the bearer token for remote calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub uid: String,
    pub id_token: String,
}

impl UserRef {
    pub fn new(uid: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            id_token: id_token.into(),
        }
    }
}

impl From<&Session> for UserRef {
    fn from(session: &Session) -> Self {
        Self::new(&session.uid, &session.id_token)
    }
}

/// Pending phone verification, stored under `verifications/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub phone_number: String,
    pub verification_code: String,
    pub created_at: DateTime<Utc>,
}

/// Record of an alert delivered to a user, stored in `sentAlerts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentAlert {
    pub user_id: String,
    pub location: String,
    pub alert_text: String,
    pub sent_at: DateTime<Utc>,
}

/// Backend holding per-user documents.
///
/// `add_favorite` and `remove_favorite` have set semantics: adding an entry
/// that is already present and removing one that is absent both succeed
/// without changing anything.
pub trait UserDataStore: Send + Sync {
    fn get_favorites(&self, user: &UserRef) -> impl Future<Output = StoreResult<Vec<String>>> + Send;

    fn save_favorites(
        &self,
        user: &UserRef,
        favorites: &[String],
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn add_favorite(&self, user: &UserRef, location: &str) -> impl Future<Output = StoreResult<()>> + Send;

    fn remove_favorite(
        &self,
        user: &UserRef,
        location: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn get_settings(&self, user: &UserRef) -> impl Future<Output = StoreResult<UserSettings>> + Send;

    /// Merge the fields set in `patch` into the stored settings.
    fn save_settings(
        &self,
        user: &UserRef,
        patch: &UserSettings,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Replace any pending verification for the user.
    fn save_verification(
        &self,
        user: &UserRef,
        verification: &Verification,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn get_verification(
        &self,
        user: &UserRef,
    ) -> impl Future<Output = StoreResult<Option<Verification>>> + Send;

    /// Set `phoneNumber` and `phoneVerified: true` on the user document.
    fn mark_phone_verified(
        &self,
        user: &UserRef,
        phone_number: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn subscribe_to_alerts(
        &self,
        user: &UserRef,
        locations: &[String],
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn record_sent_alert(
        &self,
        user: &UserRef,
        alert: &SentAlert,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}

#[derive(Debug, Clone, Default)]
struct UserDoc {
    favorites: Vec<String>,
    settings: UserSettings,
    phone_number: Option<String>,
    phone_verified: bool,
}

/// In-process store for tests and offline runs.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, UserDoc>>,
    verifications: Mutex<HashMap<String, Verification>>,
    subscriptions: Mutex<HashMap<String, Vec<String>>>,
    sent_alerts: Mutex<Vec<SentAlert>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(phoneNumber, phoneVerified)` on the user document.
    pub fn phone_status(&self, uid: &str) -> (Option<String>, bool) {
        self.users
            .lock()
            .get(uid)
            .map(|doc| (doc.phone_number.clone(), doc.phone_verified))
            .unwrap_or_default()
    }

    pub fn subscriptions(&self, uid: &str) -> Vec<String> {
        self.subscriptions.lock().get(uid).cloned().unwrap_or_default()
    }

    pub fn sent_alerts(&self) -> Vec<SentAlert> {
        self.sent_alerts.lock().clone()
    }
}

impl UserDataStore for MemoryUserStore {
    async fn get_favorites(&self, user: &UserRef) -> StoreResult<Vec<String>> {
        Ok(self
            .users
            .lock()
            .get(&user.uid)
            .map(|doc| doc.favorites.clone())
            .unwrap_or_default())
    }

    async fn save_favorites(&self, user: &UserRef, favorites: &[String]) -> StoreResult<()> {
        self.users.lock().entry(user.uid.clone()).or_default().favorites = favorites.to_vec();
        Ok(())
    }

    async fn add_favorite(&self, user: &UserRef, location: &str) -> StoreResult<()> {
        let mut users = self.users.lock();
        let favorites = &mut users.entry(user.uid.clone()).or_default().favorites;
        if !favorites.iter().any(|f| f == location) {
            favorites.push(location.to_string());
        }
        Ok(())
    }

    async fn remove_favorite(&self, user: &UserRef, location: &str) -> StoreResult<()> {
        if let Some(doc) = self.users.lock().get_mut(&user.uid) {
            doc.favorites.retain(|f| f != location);
        }
        Ok(())
    }

    async fn get_settings(&self, user: &UserRef) -> StoreResult<UserSettings> {
        Ok(self
            .users
            .lock()
            .get(&user.uid)
            .map(|doc| doc.settings.clone())
            .unwrap_or_default())
    }

    async fn save_settings(&self, user: &UserRef, patch: &UserSettings) -> StoreResult<()> {
        self.users
            .lock()
            .entry(user.uid.clone())
            .or_default()
            .settings
            .merge(patch);
        Ok(())
    }

    async fn save_verification(&self, user: &UserRef, verification: &Verification) -> StoreResult<()> {
        self.verifications
            .lock()
            .insert(user.uid.clone(), verification.clone());
        Ok(())
    }

    async fn get_verification(&self, user: &UserRef) -> StoreResult<Option<Verification>> {
        Ok(self.verifications.lock().get(&user.uid).cloned())
    }

    async fn mark_phone_verified(&self, user: &UserRef, phone_number: &str) -> StoreResult<()> {
        let mut users = self.users.lock();
        let doc = users.entry(user.uid.clone()).or_default();
        doc.phone_number = Some(phone_number.to_string());
        doc.phone_verified = true;
        Ok(())
    }

    async fn subscribe_to_alerts(&self, user: &UserRef, locations: &[String]) -> StoreResult<()> {
        self.subscriptions
            .lock()
            .insert(user.uid.clone(), locations.to_vec());
        Ok(())
    }

    async fn record_sent_alert(&self, _user: &UserRef, alert: &SentAlert) -> StoreResult<()> {
        self.sent_alerts.lock().push(alert.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use breezy_core::UnitSystem;

    fn user() -> UserRef {
        UserRef::new("u1", "token")
    }

    #[tokio::test]
    async fn test_adding_existing_favorite_is_noop() {
        let store = MemoryUserStore::new();
        store.add_favorite(&user(), "Paris").await.unwrap();
        store.add_favorite(&user(), "Tokyo").await.unwrap();
        store.add_favorite(&user(), "Paris").await.unwrap();

        assert_eq!(store.get_favorites(&user()).await.unwrap(), vec!["Paris", "Tokyo"]);
    }

    #[tokio::test]
    async fn test_removing_missing_favorite_succeeds() {
        let store = MemoryUserStore::new();
        // No document at all yet
        store.remove_favorite(&user(), "Paris").await.unwrap();

        store.add_favorite(&user(), "Oslo").await.unwrap();
        store.remove_favorite(&user(), "Paris").await.unwrap();
        assert_eq!(store.get_favorites(&user()).await.unwrap(), vec!["Oslo"]);

        store.remove_favorite(&user(), "Oslo").await.unwrap();
        assert!(store.get_favorites(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settings_merge() {
        let store = MemoryUserStore::new();
        store
            .save_settings(&user(), &UserSettings::with_unit_system(UnitSystem::Imperial))
            .await
            .unwrap();
        store
            .save_settings(
                &user(),
                &UserSettings {
                    notification_enabled: Some(true),
                    ..UserSettings::default()
                },
            )
            .await
            .unwrap();

        let settings = store.get_settings(&user()).await.unwrap();
        assert_eq!(settings.unit_system, Some(UnitSystem::Imperial));
        assert_eq!(settings.notification_enabled, Some(true));
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let store = MemoryUserStore::new();
        store.add_favorite(&user(), "Paris").await.unwrap();
        let other = UserRef::new("u2", "token");
        assert!(store.get_favorites(&other).await.unwrap().is_empty());
    }
}
