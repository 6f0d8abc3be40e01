//! Per-user preferences stored under `settings` in the user document.

use breezy_core::{Theme, UnitSystem};
use serde::{Deserialize, Serialize};

/// User preferences. Every field is optional so the same type doubles as a
/// partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_system: Option<UnitSystem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_verified: Option<bool>,
}

impl UserSettings {
    pub fn with_unit_system(units: UnitSystem) -> Self {
        Self {
            unit_system: Some(units),
            ..Self::default()
        }
    }

    /// Overlay every field set in `patch`.
    pub fn merge(&mut self, patch: &UserSettings) {
        if patch.unit_system.is_some() {
            self.unit_system = patch.unit_system;
        }
        if patch.theme.is_some() {
            self.theme = patch.theme;
        }
        if patch.notification_enabled.is_some() {
            self.notification_enabled = patch.notification_enabled;
        }
        if patch.email.is_some() {
            self.email.clone_from(&patch.email);
        }
        if patch.phone_verified.is_some() {
            self.phone_verified = patch.phone_verified;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// camelCase names of the fields set, as document field paths under
    /// `settings`.
    pub fn field_paths(&self) -> Vec<String> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => {
                map.keys().map(|k| format!("settings.{}", k)).collect()
            }
            _ => Vec::new(),
        }
    }
}
