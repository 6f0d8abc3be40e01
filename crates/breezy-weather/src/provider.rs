//! Forecast provider client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use breezy_core::{with_retry, RetryConfig, WeatherConfig};
use reqwest::Client;
use tracing::instrument;

use crate::types::{ApiErrorBody, WeatherData, WeatherError};

const FALLBACK_ERROR_MESSAGE: &str = "Weather data not available";

/// Anything that can produce a forecast for a location query.
pub trait ForecastSource: Send + Sync {
    fn fetch_forecast(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<WeatherData, WeatherError>> + Send;
}

/// Request options sent with every forecast call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastOptions {
    pub days: u8,
    pub air_quality: bool,
    pub alerts: bool,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            days: 7,
            air_quality: false,
            alerts: false,
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// HTTP client for the `forecast.json` endpoint.
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    options: ForecastOptions,
    retry: RetryConfig,
}

impl WeatherProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            options: ForecastOptions::default(),
            retry: RetryConfig::single(),
        })
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        Ok(Self::new(
            &config.api_base_url,
            &config.api_key,
            Duration::from_secs(config.request_timeout_secs),
        )?
        .with_options(ForecastOptions {
            days: config.forecast_days,
            air_quality: config.include_air_quality,
            alerts: config.include_alerts,
        }))
    }

    pub fn with_options(mut self, options: ForecastOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn options(&self) -> &ForecastOptions {
        &self.options
    }

    fn forecast_url(&self) -> String {
        format!("{}/forecast.json", self.base_url)
    }

    #[instrument(skip(self), level = "info")]
    async fn request(&self, query: &str) -> Result<WeatherData, WeatherError> {
        let url = self.forecast_url();
        let days = self.options.days.to_string();
        let params = [
            ("key", self.api_key.as_str()),
            ("q", query),
            ("days", days.as_str()),
            ("aqi", yes_no(self.options.air_quality)),
            ("alerts", yes_no(self.options.alerts)),
        ];

        let response = with_retry(self.retry.clone(), || {
            self.client.get(&url).query(&params).send()
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error);
            let code = detail.as_ref().and_then(|d| d.code);
            let message = detail
                .and_then(|d| d.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());

            tracing::warn!("Forecast request for {:?} failed ({}): {}", query, status, message);
            return Err(WeatherError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let body = response.text().await?;
        let data: WeatherData =
            serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))?;

        tracing::debug!(
            "Fetched forecast for {} ({} days)",
            data.location.display_name(),
            data.forecast.forecastday.len()
        );
        Ok(data)
    }
}

impl ForecastSource for WeatherProvider {
    async fn fetch_forecast(&self, query: &str) -> Result<WeatherData, WeatherError> {
        self.request(query).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_forecast_url_strips_trailing_slash() {
        let provider =
            WeatherProvider::new("https://api.example.com/v1/", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(provider.forecast_url(), "https://api.example.com/v1/forecast.json");
    }

    #[test]
    fn test_from_config_copies_options() {
        let config = WeatherConfig {
            forecast_days: 3,
            include_alerts: true,
            ..WeatherConfig::default()
        };
        let provider = WeatherProvider::from_config(&config).unwrap();
        assert_eq!(
            provider.options(),
            &ForecastOptions { days: 3, air_quality: false, alerts: true }
        );
    }

    #[test]
    fn test_yes_no() {
        assert_eq!(yes_no(true), "yes");
        assert_eq!(yes_no(false), "no");
    }
}
