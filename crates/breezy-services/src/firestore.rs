//! Document store over REST.
//!
//! Layout:
//! - `users/{uid}`: `favoriteLocations`, `settings`, `phoneNumber`, `phoneVerified`
//! - `verifications/{uid}`: `phoneNumber`, `verificationCode`, `createdAt`
//! - `weatherAlerts/{uid}`: `locations`, `updatedAt`
//! - `sentAlerts/{auto-id}`: `userId`, `location`, `alertText`, `sentAt`

use std::sync::Arc;
use std::time::Duration;

use breezy_core::FirebaseConfig;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};
use tracing::instrument;

use crate::codec::{decode_fields, encode, encode_fields, string_value, timestamp_value};
use crate::error::{StoreError, StoreResult};
use crate::settings::UserSettings;
use crate::store::{SentAlert, UserDataStore, UserRef, Verification};

const USERS: &str = "users";
const VERIFICATIONS: &str = "verifications";
const WEATHER_ALERTS: &str = "weatherAlerts";
const SENT_ALERTS: &str = "sentAlerts";
const FAVORITES_FIELD: &str = "favoriteLocations";

/// User data in the hosted document store.
#[derive(Debug, Clone)]
pub struct FirestoreUserStore {
    client: Arc<Client>,
    base_url: String,
    project_id: String,
}

impl FirestoreUserStore {
    pub fn new(base_url: impl Into<String>, project_id: impl Into<String>) -> StoreResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
        })
    }

    pub fn from_config(config: &FirebaseConfig) -> StoreResult<Self> {
        Self::new(&config.firestore_url, &config.project_id)
    }

    /// Resource name prefix, as used inside write requests.
    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.database_path(), collection, id)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.base_url, self.document_name(collection, id))
    }

    /// Build request with auth header
    fn build_request(&self, req: RequestBuilder, user: &UserRef) -> RequestBuilder {
        req.bearer_auth(&user.id_token)
    }

    async fn check(response: reqwest::Response) -> StoreResult<Value> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            tracing::warn!("Document store request failed ({}): {}", status, message);
            return Err(StoreError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| StoreError::decode(e.to_string()))
    }

    /// Decoded fields of a document, `None` if it does not exist.
    async fn get_document(
        &self,
        user: &UserRef,
        collection: &str,
        id: &str,
    ) -> StoreResult<Option<Value>> {
        let response = self
            .build_request(self.client.get(self.document_url(collection, id)), user)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let document = Self::check(response).await?;
        match document.get("fields") {
            Some(fields) => decode_fields(fields).map(Some),
            None => Ok(Some(Value::Object(Map::new()))),
        }
    }

    /// Create or update a document. With `mask`, only those field paths are
    /// written and everything else is kept; without, the document is replaced.
    async fn patch_document(
        &self,
        user: &UserRef,
        collection: &str,
        id: &str,
        fields: Value,
        mask: Option<&[String]>,
    ) -> StoreResult<()> {
        let mut request = self.client.patch(self.document_url(collection, id));
        if let Some(paths) = mask {
            let query: Vec<(&str, &str)> = paths
                .iter()
                .map(|p| ("updateMask.fieldPaths", p.as_str()))
                .collect();
            request = request.query(&query);
        }

        let response = self
            .build_request(request, user)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    /// Apply a single array transform to `users/{uid}.favoriteLocations`.
    async fn transform_favorites(
        &self,
        user: &UserRef,
        transform: &str,
        location: &str,
    ) -> StoreResult<()> {
        let body = json!({
            "writes": [{
                "transform": {
                    "document": self.document_name(USERS, &user.uid),
                    "fieldTransforms": [{
                        "fieldPath": FAVORITES_FIELD,
                        transform: { "values": [string_value(location)] }
                    }]
                }
            }]
        });

        let response = self
            .build_request(
                self.client
                    .post(format!("{}/{}:commit", self.base_url, self.database_path())),
                user,
            )
            .json(&body)
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn fields_of(value: Value) -> StoreResult<Value> {
    match value {
        Value::Object(map) => Ok(encode_fields(&map)),
        other => Err(StoreError::decode(format!("expected an object, got {}", other))),
    }
}

impl UserDataStore for FirestoreUserStore {
    #[instrument(skip(self, user), fields(uid = %user.uid), level = "debug")]
    async fn get_favorites(&self, user: &UserRef) -> StoreResult<Vec<String>> {
        let doc = self.get_document(user, USERS, &user.uid).await?;
        Ok(string_list(doc.as_ref().and_then(|d| d.get(FAVORITES_FIELD))))
    }

    #[instrument(skip(self, user, favorites), fields(uid = %user.uid), level = "debug")]
    async fn save_favorites(&self, user: &UserRef, favorites: &[String]) -> StoreResult<()> {
        let fields = json!({ FAVORITES_FIELD: encode(&json!(favorites)) });
        let mask = [FAVORITES_FIELD.to_string()];
        self.patch_document(user, USERS, &user.uid, fields, Some(&mask[..]))
            .await
    }

    #[instrument(skip(self, user), fields(uid = %user.uid), level = "debug")]
    async fn add_favorite(&self, user: &UserRef, location: &str) -> StoreResult<()> {
        self.transform_favorites(user, "appendMissingElements", location).await
    }

    #[instrument(skip(self, user), fields(uid = %user.uid), level = "debug")]
    async fn remove_favorite(&self, user: &UserRef, location: &str) -> StoreResult<()> {
        self.transform_favorites(user, "removeAllFromArray", location).await
    }

    #[instrument(skip(self, user), fields(uid = %user.uid), level = "debug")]
    async fn get_settings(&self, user: &UserRef) -> StoreResult<UserSettings> {
        let doc = self.get_document(user, USERS, &user.uid).await?;
        match doc.and_then(|mut d| d.get_mut("settings").map(Value::take)) {
            Some(settings) => serde_json::from_value(settings)
                .map_err(|e| StoreError::decode(format!("settings: {}", e))),
            None => Ok(UserSettings::default()),
        }
    }

    #[instrument(skip(self, user), fields(uid = %user.uid), level = "debug")]
    async fn save_settings(&self, user: &UserRef, patch: &UserSettings) -> StoreResult<()> {
        let paths = patch.field_paths();
        if paths.is_empty() {
            return Ok(());
        }
        let settings = serde_json::to_value(patch).map_err(|e| StoreError::decode(e.to_string()))?;
        let fields = json!({ "settings": encode(&settings) });
        self.patch_document(user, USERS, &user.uid, fields, Some(paths.as_slice()))
            .await
    }

    #[instrument(skip(self, user, verification), fields(uid = %user.uid), level = "debug")]
    async fn save_verification(&self, user: &UserRef, verification: &Verification) -> StoreResult<()> {
        let fields = json!({
            "phoneNumber": string_value(&verification.phone_number),
            "verificationCode": string_value(&verification.verification_code),
            "createdAt": timestamp_value(verification.created_at),
        });
        self.patch_document(user, VERIFICATIONS, &user.uid, fields, None).await
    }

    #[instrument(skip(self, user), fields(uid = %user.uid), level = "debug")]
    async fn get_verification(&self, user: &UserRef) -> StoreResult<Option<Verification>> {
        match self.get_document(user, VERIFICATIONS, &user.uid).await? {
            Some(doc) => serde_json::from_value(doc)
                .map(Some)
                .map_err(|e| StoreError::decode(format!("verification: {}", e))),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, user), fields(uid = %user.uid), level = "debug")]
    async fn mark_phone_verified(&self, user: &UserRef, phone_number: &str) -> StoreResult<()> {
        let fields = fields_of(json!({ "phoneNumber": phone_number, "phoneVerified": true }))?;
        let mask = ["phoneNumber".to_string(), "phoneVerified".to_string()];
        self.patch_document(user, USERS, &user.uid, fields, Some(&mask[..])).await
    }

    #[instrument(skip(self, user, locations), fields(uid = %user.uid), level = "debug")]
    async fn subscribe_to_alerts(&self, user: &UserRef, locations: &[String]) -> StoreResult<()> {
        let fields = json!({
            "locations": encode(&json!(locations)),
            "updatedAt": timestamp_value(chrono::Utc::now()),
        });
        let mask = ["locations".to_string(), "updatedAt".to_string()];
        self.patch_document(user, WEATHER_ALERTS, &user.uid, fields, Some(&mask[..]))
            .await
    }

    /// Adds a `sentAlerts` document with a generated id.
    #[instrument(skip(self, user, alert), fields(uid = %user.uid), level = "debug")]
    async fn record_sent_alert(&self, user: &UserRef, alert: &SentAlert) -> StoreResult<()> {
        let fields = json!({
            "userId": string_value(&alert.user_id),
            "location": string_value(&alert.location),
            "alertText": string_value(&alert.alert_text),
            "sentAt": timestamp_value(alert.sent_at),
        });
        let response = self
            .build_request(
                self.client
                    .post(format!("{}/{}/{}", self.base_url, self.database_path(), SENT_ALERTS)),
                user,
            )
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }
}
