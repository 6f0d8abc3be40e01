//! Weather alert subscriptions and user notices.

use breezy_weather::{AlertSeverity, WeatherData};
use chrono::Utc;

use crate::error::StoreResult;
use crate::store::{SentAlert, UserDataStore, UserRef};

/// Subscribe the user to alerts for `locations`, replacing any previous list.
pub async fn subscribe_to_weather_alerts<S: UserDataStore>(
    store: &S,
    user: &UserRef,
    locations: &[String],
) -> StoreResult<()> {
    store.subscribe_to_alerts(user, locations).await?;
    tracing::info!("{} subscribed to alerts for {} locations", user.uid, locations.len());
    Ok(())
}

/// Record that `alert_text` was sent to the user for `location`.
pub async fn send_weather_alert<S: UserDataStore>(
    store: &S,
    user: &UserRef,
    location: &str,
    alert_text: &str,
) -> StoreResult<()> {
    let alert = SentAlert {
        user_id: user.uid.clone(),
        location: location.to_string(),
        alert_text: alert_text.to_string(),
        sent_at: Utc::now(),
    };
    store.record_sent_alert(user, &alert).await?;
    tracing::info!("Weather alert for {} sent to {}", location, user.uid);
    Ok(())
}

/// Send every active alert in `data` whose severity is at least `min`.
/// Returns how many were sent.
pub async fn send_active_alerts<S: UserDataStore>(
    store: &S,
    user: &UserRef,
    data: &WeatherData,
    min: AlertSeverity,
) -> StoreResult<usize> {
    let location = data.location.display_name();
    let mut sent = 0;
    for alert in data.alert_list() {
        if AlertSeverity::parse(&alert.severity) < min {
            continue;
        }
        send_weather_alert(store, user, &location, &alert.headline).await?;
        sent += 1;
    }
    Ok(sent)
}

/// Welcome message for a new account. Only logged; there is no mail transport.
pub fn send_welcome_email(email: &str, name: &str) {
    tracing::info!("Welcome email would be sent to {} for {}", email, name);
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::store::MemoryUserStore;

    fn data_with_alerts() -> WeatherData {
        serde_json::from_value(serde_json::json!({
            "location": {
                "name": "Miami", "region": "Florida", "country": "USA",
                "lat": 25.77, "lon": -80.19, "tz_id": "America/New_York",
                "localtime_epoch": 0, "localtime": "2026-10-19 08:00"
            },
            "current": { "temp_c": 29.0, "temp_f": 84.2 },
            "forecast": { "forecastday": [] },
            "alerts": { "alert": [
                { "headline": "Hurricane Warning", "severity": "Extreme" },
                { "headline": "Rip Current Statement", "severity": "Moderate" },
                { "headline": "Heat Advisory", "severity": "Minor" }
            ]}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_subscribe_replaces_locations() {
        let store = MemoryUserStore::new();
        let user = UserRef::new("u1", "t");
        subscribe_to_weather_alerts(&store, &user, &["Paris".into(), "Oslo".into()])
            .await
            .unwrap();
        subscribe_to_weather_alerts(&store, &user, &["Lima".into()]).await.unwrap();

        assert_eq!(store.subscriptions("u1"), vec!["Lima"]);
    }

    #[tokio::test]
    async fn test_send_active_alerts_filters_by_severity() {
        let store = MemoryUserStore::new();
        let user = UserRef::new("u1", "t");

        let sent = send_active_alerts(&store, &user, &data_with_alerts(), AlertSeverity::Moderate)
            .await
            .unwrap();

        assert_eq!(sent, 2);
        let records = store.sent_alerts();
        assert_eq!(records[0].alert_text, "Hurricane Warning");
        assert_eq!(records[0].location, "Miami, Florida, USA");
        assert_eq!(records[1].user_id, "u1");
    }
}
