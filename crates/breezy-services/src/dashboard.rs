//! Dashboard state: the current forecast, unit system, favorites and
//! settings, plus a queue of notices for the user.
//!
//! Failures never escape as errors here. They are logged and queued as
//! error toasts while the previous state is kept.

use std::sync::Arc;
use std::time::Duration;

use breezy_core::{Theme, UiConfig, UnitSystem};
use breezy_weather::{
    current_location_query, Clock, ForecastSource, Geolocator, SystemClock, WeatherData,
    WeatherService, WeatherView,
};
use serde::Serialize;

use crate::error::StoreResult;
use crate::local_store::LocalStore;
use crate::settings::UserSettings;
use crate::store::{UserDataStore, UserRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// A transient notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Info,
            message: message.into(),
        }
    }
}

pub struct Dashboard<S: ForecastSource, U: UserDataStore, C: Clock = SystemClock> {
    weather: WeatherService<S, C>,
    users: U,
    local: LocalStore,
    session: Option<UserRef>,
    favorites: Vec<String>,
    settings: UserSettings,
    units: UnitSystem,
    theme: Theme,
    current: Option<Arc<WeatherData>>,
    current_location: Option<String>,
    toasts: Vec<Toast>,
}

impl<S: ForecastSource, U: UserDataStore, C: Clock> Dashboard<S, U, C> {
    /// Start signed out. A unit system saved by an earlier guest session
    /// wins over the configured default.
    pub fn new(
        weather: WeatherService<S, C>,
        users: U,
        local: LocalStore,
        ui: &UiConfig,
    ) -> StoreResult<Self> {
        let units = local.guest_unit_system()?.unwrap_or(ui.unit_system);
        let favorites = local.guest_favorites()?;

        Ok(Self {
            weather,
            users,
            local,
            session: None,
            favorites,
            settings: UserSettings::default(),
            units,
            theme: ui.theme,
            current: None,
            current_location: None,
            toasts: Vec::new(),
        })
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn user(&self) -> Option<&UserRef> {
        self.session.as_ref()
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    pub fn weather(&self) -> Option<&Arc<WeatherData>> {
        self.current.as_ref()
    }

    pub fn current_location(&self) -> Option<&str> {
        self.current_location.as_deref()
    }

    pub fn unit_system(&self) -> UnitSystem {
        self.units
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn favorites(&self) -> &[String] {
        &self.favorites
    }

    pub fn is_favorite(&self, location: &str) -> bool {
        self.favorites.iter().any(|f| f == location)
    }

    /// Current forecast in the active unit system.
    pub fn view(&self) -> Option<WeatherView> {
        self.current
            .as_deref()
            .map(|data| WeatherView::derive(data, self.units))
    }

    pub fn history(&self) -> Vec<String> {
        match self.local.search_history() {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!("Failed to read search history: {}", e);
                Vec::new()
            }
        }
    }

    pub fn clear_history(&mut self) -> bool {
        match self.local.clear_history() {
            Ok(()) => true,
            Err(e) => {
                self.push_error(format!("Failed to clear history: {}", e));
                false
            }
        }
    }

    /// Drain queued notices, oldest first.
    pub fn take_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    fn push_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.toasts.push(Toast::error(message));
    }

    /// Fetch the forecast for `location` and make it current. The query is
    /// used as typed, so it is also the cache key as typed.
    /// Returns false for blank input or a failed lookup.
    pub async fn search(&mut self, location: &str) -> bool {
        if location.trim().is_empty() {
            return false;
        }

        let purged = self.weather.purge_expired();
        if purged > 0 {
            tracing::debug!("Dropped {} stale forecasts", purged);
        }

        match self.weather.get_weather(location).await {
            Ok(data) => {
                self.current = Some(data);
                self.current_location = Some(location.to_string());
                if let Err(e) = self.local.record_search(location) {
                    tracing::warn!("Failed to record search: {}", e);
                }
                true
            }
            Err(e) => {
                self.push_error(e.to_string());
                false
            }
        }
    }

    /// Look up the device position and search for it.
    pub async fn search_current_location<G: Geolocator>(
        &mut self,
        geolocator: &G,
        timeout: Duration,
    ) -> bool {
        match current_location_query(geolocator, timeout).await {
            Ok(query) => self.search(&query).await,
            Err(e) => {
                self.push_error(format!("Unable to get your location: {}", e));
                false
            }
        }
    }

    /// Switch to the other unit system. Returns the new one.
    pub async fn toggle_units(&mut self) -> UnitSystem {
        let next = self.units.toggled();
        self.set_unit_system(next).await;
        next
    }

    /// The change applies immediately; persisting it is best effort.
    pub async fn set_unit_system(&mut self, units: UnitSystem) {
        self.units = units;

        match self.session.clone() {
            Some(user) => {
                let patch = UserSettings::with_unit_system(units);
                match self.users.save_settings(&user, &patch).await {
                    Ok(()) => self.settings.merge(&patch),
                    Err(e) => self.push_error(format!("Failed to save settings: {}", e)),
                }
            }
            None => {
                if let Err(e) = self.local.set_guest_unit_system(units) {
                    tracing::warn!("Failed to store unit system: {}", e);
                }
            }
        }
    }

    pub async fn add_favorite(&mut self, location: &str) -> bool {
        let location = location.trim();
        if location.is_empty() {
            return false;
        }

        let result = match &self.session {
            Some(user) => self.users.add_favorite(user, location).await,
            None => self.local.add_guest_favorite(location).map(|_| ()),
        };

        match result {
            Ok(()) => {
                if !self.is_favorite(location) {
                    self.favorites.push(location.to_string());
                }
                self.toasts
                    .push(Toast::success(format!("Added {} to favorites", location)));
                true
            }
            Err(e) => {
                self.push_error(format!("Failed to add favorite: {}", e));
                false
            }
        }
    }

    pub async fn remove_favorite(&mut self, location: &str) -> bool {
        let location = location.trim();
        if location.is_empty() {
            return false;
        }

        let result = match &self.session {
            Some(user) => self.users.remove_favorite(user, location).await,
            None => self.local.remove_guest_favorite(location).map(|_| ()),
        };

        match result {
            Ok(()) => {
                self.favorites.retain(|f| f != location);
                self.toasts
                    .push(Toast::info(format!("Removed {} from favorites", location)));
                true
            }
            Err(e) => {
                self.push_error(format!("Failed to remove favorite: {}", e));
                false
            }
        }
    }

    /// Adopt `user` and load their favorites and settings. On a load failure
    /// the user stays signed in with empty data and an error toast is queued.
    pub async fn sign_in(&mut self, user: UserRef) -> bool {
        let loaded = async {
            let favorites = self.users.get_favorites(&user).await?;
            let settings = self.users.get_settings(&user).await?;
            StoreResult::Ok((favorites, settings))
        }
        .await;

        self.session = Some(user);
        match loaded {
            Ok((favorites, settings)) => {
                self.favorites = favorites;
                if let Some(units) = settings.unit_system {
                    self.units = units;
                }
                if let Some(theme) = settings.theme {
                    self.theme = theme;
                }
                self.settings = settings;
                true
            }
            Err(e) => {
                self.favorites.clear();
                self.settings = UserSettings::default();
                self.push_error(format!("Failed to load your data: {}", e));
                false
            }
        }
    }

    /// Forget the user. Guest favorites and unit system come back from
    /// local storage.
    pub fn sign_out(&mut self) {
        self.session = None;
        self.settings = UserSettings::default();
        self.favorites = match self.local.guest_favorites() {
            Ok(favorites) => favorites,
            Err(e) => {
                tracing::warn!("Failed to read guest favorites: {}", e);
                Vec::new()
            }
        };
        if let Ok(Some(units)) = self.local.guest_unit_system() {
            self.units = units;
        }
    }

    /// Merge `patch` into the user's settings. Needs a signed-in user.
    pub async fn save_settings(&mut self, patch: &UserSettings) -> bool {
        let Some(user) = self.session.clone() else {
            self.push_error("Sign in to save settings");
            return false;
        };

        match self.users.save_settings(&user, patch).await {
            Ok(()) => {
                self.settings.merge(patch);
                if let Some(units) = patch.unit_system {
                    self.units = units;
                }
                if let Some(theme) = patch.theme {
                    self.theme = theme;
                }
                self.toasts.push(Toast::success("Settings saved"));
                true
            }
            Err(e) => {
                self.push_error(format!("Failed to save settings: {}", e));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::store::MemoryUserStore;
    use breezy_weather::{Coordinates, FixedGeolocator, ManualClock, WeatherCache, WeatherError};
    use parking_lot::Mutex;

    /// Serves a fixed forecast for every query except "Nowhere".
    #[derive(Default)]
    struct StubSource {
        queries: Mutex<Vec<String>>,
    }

    impl ForecastSource for StubSource {
        async fn fetch_forecast(&self, query: &str) -> Result<WeatherData, WeatherError> {
            self.queries.lock().push(query.to_string());
            if query == "Nowhere" {
                return Err(WeatherError::Api {
                    status: 400,
                    code: Some(1006),
                    message: "No matching location found.".into(),
                });
            }
            Ok(serde_json::from_value(serde_json::json!({
                "location": {
                    "name": query, "region": "", "country": "Testland",
                    "lat": 1.0, "lon": 2.0, "tz_id": "UTC",
                    "localtime_epoch": 0, "localtime": "2026-10-19 12:00"
                },
                "current": {
                    "temp_c": 20.0, "temp_f": 68.0,
                    "wind_kph": 10.0, "wind_mph": 6.2,
                    "vis_km": 10.0, "vis_miles": 6.0
                },
                "forecast": { "forecastday": [] }
            }))
            .unwrap())
        }
    }

    type TestDashboard = Dashboard<StubSource, MemoryUserStore, ManualClock>;

    fn dashboard() -> TestDashboard {
        dashboard_with_clock(ManualClock::new(0))
    }

    fn dashboard_with_clock(clock: ManualClock) -> TestDashboard {
        let weather = WeatherService::with_cache(
            StubSource::default(),
            WeatherCache::with_clock(Duration::from_secs(600), clock),
        );
        Dashboard::new(
            weather,
            MemoryUserStore::new(),
            LocalStore::in_memory().unwrap(),
            &UiConfig::default(),
        )
        .unwrap()
    }

    fn user() -> UserRef {
        UserRef::new("u1", "token")
    }

    #[tokio::test]
    async fn test_search_sets_current_weather_and_history() {
        let mut dash = dashboard();
        assert!(dash.search("Paris").await);

        assert_eq!(dash.current_location(), Some("Paris"));
        assert_eq!(dash.weather().unwrap().location.name, "Paris");
        assert_eq!(dash.history(), vec!["Paris"]);
        assert!(dash.take_toasts().is_empty());
    }

    #[tokio::test]
    async fn test_search_keeps_query_as_typed() {
        let mut dash = dashboard();
        assert!(dash.search(" Paris ").await);
        assert!(dash.search("Paris").await);
        assert!(dash.search(" Paris ").await);

        // Padded and bare queries are separate cache entries
        assert_eq!(
            *dash.weather.source().queries.lock(),
            vec![" Paris ".to_string(), "Paris".to_string()]
        );
        assert_eq!(dash.current_location(), Some(" Paris "));
        assert_eq!(dash.history(), vec!["Paris"]);
    }

    #[tokio::test]
    async fn test_search_drops_stale_forecasts() {
        let clock = ManualClock::new(0);
        let mut dash = dashboard_with_clock(clock.clone());
        dash.search("Paris").await;
        dash.search("Oslo").await;
        assert_eq!(dash.weather.cached_len(), 2);

        clock.advance(Duration::from_secs(601));
        dash.search("Lima").await;

        assert_eq!(dash.weather.cached_len(), 1);
        assert!(dash.weather.cached("Lima").is_some());
    }

    #[tokio::test]
    async fn test_blank_search_does_nothing() {
        let mut dash = dashboard();
        assert!(!dash.search("   ").await);
        assert!(dash.weather().is_none());
        assert!(dash.history().is_empty());
    }

    #[tokio::test]
    async fn test_clear_history() {
        let mut dash = dashboard();
        dash.search("Paris").await;
        dash.search("Oslo").await;
        assert_eq!(dash.history(), vec!["Oslo", "Paris"]);

        assert!(dash.clear_history());
        assert!(dash.history().is_empty());
    }

    #[tokio::test]
    async fn test_failed_search_keeps_previous_weather() {
        let mut dash = dashboard();
        dash.search("Paris").await;

        assert!(!dash.search("Nowhere").await);
        assert_eq!(dash.current_location(), Some("Paris"));
        assert_eq!(dash.weather().unwrap().location.name, "Paris");
        assert_eq!(dash.history(), vec!["Paris"]);

        let toasts = dash.take_toasts();
        assert_eq!(toasts, vec![Toast::error("No matching location found.")]);
        assert!(dash.take_toasts().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_units_rederives_without_fetch() {
        let mut dash = dashboard();
        dash.search("Paris").await;
        let metric = dash.view().unwrap();
        assert_eq!(metric.current.temperature, 20.0);

        assert_eq!(dash.toggle_units().await, UnitSystem::Imperial);
        let imperial = dash.view().unwrap();
        assert_eq!(imperial.current.temperature, 68.0);
        assert_eq!(imperial.current.wind_speed, 6.2);
        assert_eq!(imperial.current.visibility, 6.0);
        assert_eq!(imperial.labels.temperature, "°F");

        assert_eq!(dash.toggle_units().await, UnitSystem::Metric);
        assert_eq!(dash.view().unwrap(), metric);
        assert_eq!(dash.weather.source().queries.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_guest_units_persist_locally() {
        let mut dash = dashboard();
        dash.toggle_units().await;
        assert_eq!(dash.local.guest_unit_system().unwrap(), Some(UnitSystem::Imperial));
        assert!(dash.users.get_settings(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_signed_in_units_persist_to_settings() {
        let mut dash = dashboard();
        dash.sign_in(user()).await;
        dash.set_unit_system(UnitSystem::Imperial).await;

        let stored = dash.users.get_settings(&user()).await.unwrap();
        assert_eq!(stored.unit_system, Some(UnitSystem::Imperial));
        assert_eq!(dash.local.guest_unit_system().unwrap(), None);
    }

    #[tokio::test]
    async fn test_guest_favorites_are_a_set() {
        let mut dash = dashboard();
        assert!(dash.add_favorite("Paris").await);
        assert!(dash.add_favorite("Paris").await);
        assert_eq!(dash.favorites(), ["Paris".to_string()]);
        assert_eq!(dash.local.guest_favorites().unwrap(), vec!["Paris"]);

        assert!(dash.remove_favorite("Tokyo").await);
        assert!(dash.remove_favorite("Paris").await);
        assert!(dash.favorites().is_empty());
    }

    #[tokio::test]
    async fn test_padded_favorite_round_trip() {
        let mut dash = dashboard();
        assert!(dash.add_favorite(" Paris ").await);
        assert_eq!(dash.favorites(), ["Paris".to_string()]);

        assert!(dash.remove_favorite(" Paris ").await);
        assert!(dash.favorites().is_empty());
        assert!(dash.local.guest_favorites().unwrap().is_empty());

        dash.sign_in(user()).await;
        dash.add_favorite("  Rome").await;
        dash.remove_favorite("Rome  ").await;
        assert!(dash.users.get_favorites(&user()).await.unwrap().is_empty());
        assert!(dash.favorites().is_empty());
    }

    #[tokio::test]
    async fn test_signed_in_favorites_go_to_user_store() {
        let mut dash = dashboard();
        dash.sign_in(user()).await;
        dash.add_favorite("Oslo").await;
        dash.add_favorite("Lima").await;
        dash.remove_favorite("Oslo").await;

        assert_eq!(dash.users.get_favorites(&user()).await.unwrap(), vec!["Lima"]);
        assert!(dash.local.guest_favorites().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_applies_stored_settings_and_sign_out_resets() {
        let mut dash = dashboard();
        dash.add_favorite("Guest Town").await;

        let store = &dash.users;
        store.add_favorite(&user(), "Rome").await.unwrap();
        store
            .save_settings(
                &user(),
                &UserSettings {
                    unit_system: Some(UnitSystem::Imperial),
                    theme: Some(Theme::Dark),
                    ..UserSettings::default()
                },
            )
            .await
            .unwrap();

        assert!(dash.sign_in(user()).await);
        assert!(dash.is_signed_in());
        assert_eq!(dash.favorites(), ["Rome".to_string()]);
        assert_eq!(dash.unit_system(), UnitSystem::Imperial);
        assert_eq!(dash.theme(), Theme::Dark);

        dash.sign_out();
        assert!(!dash.is_signed_in());
        assert_eq!(dash.favorites(), ["Guest Town".to_string()]);
        assert!(dash.settings().is_empty());
    }

    #[tokio::test]
    async fn test_save_settings_requires_sign_in() {
        let mut dash = dashboard();
        assert!(!dash.save_settings(&UserSettings::with_unit_system(UnitSystem::Imperial)).await);
        assert_eq!(dash.take_toasts()[0].kind, ToastKind::Error);

        dash.sign_in(user()).await;
        let patch = UserSettings {
            notification_enabled: Some(true),
            ..UserSettings::default()
        };
        assert!(dash.save_settings(&patch).await);
        assert_eq!(dash.settings().notification_enabled, Some(true));
        assert_eq!(dash.take_toasts(), vec![Toast::success("Settings saved")]);
    }

    #[tokio::test]
    async fn test_search_current_location_uses_coordinates() {
        let mut dash = dashboard();
        let here = FixedGeolocator::new(Coordinates::new(48.85, 2.35));

        assert!(dash.search_current_location(&here, Duration::from_secs(5)).await);
        assert_eq!(dash.current_location(), Some("48.85,2.35"));
    }
}
