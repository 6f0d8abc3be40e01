//! User data services for Breezy
//!
//! Favorites, settings, phone verification and alert subscriptions in the
//! hosted document store, local storage for signed-out use, and the
//! dashboard state that ties them to the weather service.

pub mod codec;
pub mod dashboard;
pub mod error;
pub mod firestore;
pub mod local_store;
pub mod notify;
pub mod phone;
pub mod settings;
pub mod store;

pub use dashboard::{Dashboard, Toast, ToastKind};
pub use error::{StoreError, StoreResult};
pub use firestore::FirestoreUserStore;
pub use local_store::{LocalStore, MAX_HISTORY};
pub use notify::{send_active_alerts, send_weather_alert, send_welcome_email, subscribe_to_weather_alerts};
pub use phone::{normalize_phone, CodeDelivery, LogDelivery, PhoneVerifier, CODE_LIFETIME};
pub use settings::UserSettings;
pub use store::{MemoryUserStore, SentAlert, UserDataStore, UserRef, Verification};
