//! Integration tests for WeatherProvider and WeatherService using wiremock.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::time::Duration;

use breezy_weather::{
    ForecastOptions, ForecastSource, WeatherError, WeatherProvider, WeatherService, DEFAULT_TTL,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn forecast_body(name: &str) -> serde_json::Value {
    serde_json::json!({
        "location": {
            "name": name, "region": "Ile-de-France", "country": "France",
            "lat": 48.87, "lon": 2.33, "tz_id": "Europe/Paris",
            "localtime_epoch": 1760871600, "localtime": "2026-10-19 13:00"
        },
        "current": {
            "temp_c": 17.0, "temp_f": 62.6, "is_day": 1,
            "condition": { "text": "Sunny", "code": 1000 },
            "wind_kph": 11.2, "wind_mph": 6.9, "humidity": 55,
            "vis_km": 10.0, "vis_miles": 6.0, "uv": 4.0
        },
        "forecast": { "forecastday": [
            {
                "date": "2026-10-19",
                "day": { "maxtemp_c": 18.0, "maxtemp_f": 64.4, "mintemp_c": 9.0, "mintemp_f": 48.2,
                         "condition": { "text": "Sunny", "code": 1000 } },
                "astro": { "sunrise": "08:12 AM", "sunset": "06:51 PM", "moon_phase": "New Moon" }
            }
        ]}
    })
}

fn provider(server: &MockServer) -> WeatherProvider {
    WeatherProvider::new(format!("{}/v1", server.uri()), "test-key", Duration::from_secs(5))
        .unwrap()
        .with_options(ForecastOptions {
            days: 7,
            air_quality: true,
            alerts: true,
        })
}

#[tokio::test]
async fn test_fetch_forecast_sends_expected_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .and(query_param("key", "test-key"))
        .and(query_param("q", "Paris"))
        .and(query_param("days", "7"))
        .and(query_param("aqi", "yes"))
        .and(query_param("alerts", "yes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body("Paris")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let data = provider(&mock_server).fetch_forecast("Paris").await.unwrap();

    assert_eq!(data.location.name, "Paris");
    assert_eq!(data.current.temp_c, 17.0);
    assert_eq!(data.forecast.forecastday.len(), 1);
    assert_eq!(data.forecast.forecastday[0].astro.moon_phase, "New Moon");
}

#[tokio::test]
async fn test_provider_error_message_is_kept() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "code": 1006, "message": "No matching location found." }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server)
        .fetch_forecast("Atlantis")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "No matching location found.");
    match err {
        WeatherError::Api { status, code, .. } => {
            assert_eq!(status, 400);
            assert_eq!(code, Some(1006));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_error_without_body_uses_fallback_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server).fetch_forecast("Paris").await.unwrap_err();
    assert_eq!(err.to_string(), "Weather data not available");
}

#[tokio::test]
async fn test_server_error_is_retried_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body("Paris")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let data = provider(&mock_server).fetch_forecast("Paris").await.unwrap();
    assert_eq!(data.location.name, "Paris");
}

#[tokio::test]
async fn test_persistent_server_error_gives_up_after_one_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server).fetch_forecast("Paris").await.unwrap_err();
    assert!(matches!(err, WeatherError::Api { status: 500, .. }));
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server).fetch_forecast("Paris").await.unwrap_err();
    assert!(matches!(err, WeatherError::Parse(_)));
}

#[tokio::test]
async fn test_service_serves_repeat_query_from_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .and(query_param("q", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body("Paris")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = WeatherService::new(provider(&mock_server), DEFAULT_TTL);
    let first = service.get_weather("Paris").await.unwrap();
    let second = service.get_weather("Paris").await.unwrap();

    assert_eq!(*first, *second);
    assert!(service.cached("Paris").is_some());
}
