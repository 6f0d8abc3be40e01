//! Phone number verification with one-time codes.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{StoreError, StoreResult};
use crate::settings::UserSettings;
use crate::store::{UserDataStore, UserRef, Verification};

/// How long a sent code stays valid.
pub const CODE_LIFETIME: Duration = Duration::from_secs(10 * 60);

/// Shortest accepted number, counting the leading `+`.
pub const MIN_PHONE_LEN: usize = 10;

/// Channel that gets a code to the user.
pub trait CodeDelivery: Send + Sync {
    fn deliver(&self, phone_number: &str, code: &str) -> StoreResult<()>;
}

/// Writes the code to the log instead of sending an SMS.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDelivery;

impl CodeDelivery for LogDelivery {
    fn deliver(&self, phone_number: &str, code: &str) -> StoreResult<()> {
        tracing::info!("Verification code for {}: {}", phone_number, code);
        Ok(())
    }
}

/// Strip spaces and separators and make sure the number starts with `+`.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    format!("+{}", digits)
}

fn generate_code() -> String {
    let n = uuid::Uuid::new_v4().as_u128() % 1_000_000;
    format!("{:06}", n)
}

pub struct PhoneVerifier<D: CodeDelivery = LogDelivery> {
    delivery: D,
    lifetime: Duration,
}

impl Default for PhoneVerifier<LogDelivery> {
    fn default() -> Self {
        Self::new(LogDelivery)
    }
}

impl<D: CodeDelivery> PhoneVerifier<D> {
    pub fn new(delivery: D) -> Self {
        Self {
            delivery,
            lifetime: CODE_LIFETIME,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Store a fresh code for `phone` and hand it to the delivery channel.
    /// Returns the normalized number the code was issued for.
    pub async fn send_code<S: UserDataStore>(
        &self,
        store: &S,
        user: &UserRef,
        phone: &str,
    ) -> StoreResult<String> {
        let phone_number = normalize_phone(phone);
        if phone_number.len() < MIN_PHONE_LEN {
            return Err(StoreError::validation("Please enter a valid phone number"));
        }

        let code = generate_code();
        store
            .save_verification(
                user,
                &Verification {
                    phone_number: phone_number.clone(),
                    verification_code: code.clone(),
                    created_at: Utc::now(),
                },
            )
            .await?;

        self.delivery.deliver(&phone_number, &code)?;
        tracing::info!("Verification code sent to {}", phone_number);
        Ok(phone_number)
    }

    /// True iff a pending code exists for this phone, matches and has not
    /// expired. On success the user document and settings are updated.
    pub async fn verify<S: UserDataStore>(
        &self,
        store: &S,
        user: &UserRef,
        phone: &str,
        code: &str,
    ) -> StoreResult<bool> {
        self.verify_at(store, user, phone, code, Utc::now()).await
    }

    async fn verify_at<S: UserDataStore>(
        &self,
        store: &S,
        user: &UserRef,
        phone: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let phone_number = normalize_phone(phone);
        let Some(pending) = store.get_verification(user).await? else {
            tracing::debug!("No pending verification for {}", user.uid);
            return Ok(false);
        };

        if pending.phone_number != phone_number || pending.verification_code != code.trim() {
            return Ok(false);
        }

        let age = now.signed_duration_since(pending.created_at);
        let lifetime = chrono::Duration::from_std(self.lifetime).unwrap_or(chrono::Duration::MAX);
        if age >= lifetime {
            tracing::debug!("Verification code for {} expired", phone_number);
            return Ok(false);
        }

        store.mark_phone_verified(user, &phone_number).await?;
        store
            .save_settings(
                user,
                &UserSettings {
                    phone_verified: Some(true),
                    ..UserSettings::default()
                },
            )
            .await?;

        tracing::info!("Phone {} verified for {}", phone_number, user.uid);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::store::MemoryUserStore;
    use parking_lot::Mutex;

    /// Remembers the last code instead of sending it.
    #[derive(Default)]
    struct Capture {
        last: Mutex<Option<(String, String)>>,
    }

    impl CodeDelivery for &Capture {
        fn deliver(&self, phone_number: &str, code: &str) -> StoreResult<()> {
            *self.last.lock() = Some((phone_number.to_string(), code.to_string()));
            Ok(())
        }
    }

    fn user() -> UserRef {
        UserRef::new("u1", "token")
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+1 (555) 010-9999"), "+15550109999");
        assert_eq!(normalize_phone("44 20 7946 0000"), "+442079460000");
    }

    #[test]
    fn test_codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_short_number_is_rejected() {
        let store = MemoryUserStore::new();
        let err = PhoneVerifier::default()
            .send_code(&store, &user(), "12345")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.get_verification(&user()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_matching_code_verifies() {
        let store = MemoryUserStore::new();
        let capture = Capture::default();
        let verifier = PhoneVerifier::new(&capture);

        let phone = verifier.send_code(&store, &user(), "+1 555 010 9999").await.unwrap();
        let (sent_to, code) = capture.last.lock().clone().unwrap();
        assert_eq!(sent_to, phone);

        assert!(verifier.verify(&store, &user(), "+15550109999", &code).await.unwrap());
        assert_eq!(store.phone_status("u1"), (Some(phone), true));
        assert_eq!(
            store.get_settings(&user()).await.unwrap().phone_verified,
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_wrong_code_or_phone_fails() {
        let store = MemoryUserStore::new();
        let capture = Capture::default();
        let verifier = PhoneVerifier::new(&capture);
        verifier.send_code(&store, &user(), "+15550109999").await.unwrap();
        let (_, code) = capture.last.lock().clone().unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        assert!(!verifier.verify(&store, &user(), "+15550109999", wrong).await.unwrap());
        assert!(!verifier.verify(&store, &user(), "+15550100000", &code).await.unwrap());
        assert_eq!(store.phone_status("u1"), (None, false));
    }

    #[tokio::test]
    async fn test_without_pending_code_fails() {
        let store = MemoryUserStore::new();
        let ok = PhoneVerifier::default()
            .verify(&store, &user(), "+15550109999", "123456")
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_expired_code_fails() {
        let store = MemoryUserStore::new();
        store
            .save_verification(
                &user(),
                &Verification {
                    phone_number: "+15550109999".into(),
                    verification_code: "424242".into(),
                    created_at: Utc::now() - chrono::Duration::minutes(11),
                },
            )
            .await
            .unwrap();

        let verifier = PhoneVerifier::default();
        assert!(!verifier.verify(&store, &user(), "+15550109999", "424242").await.unwrap());

        // Still inside the window when checked earlier
        let created = store.get_verification(&user()).await.unwrap().unwrap().created_at;
        assert!(verifier
            .verify_at(&store, &user(), "+15550109999", "424242", created + chrono::Duration::minutes(9))
            .await
            .unwrap());
    }
}
